use serde_json::Value;

use super::error::{SearchError, SearchResult};
use crate::schema::LimitCfg;

/// Offset/limit window for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
    pub offset: u64,
}

pub struct Pager;

impl Pager {
    /// Clamp the requested page and limit.
    ///
    /// A limit outside `1..=max` falls back to the entity default (it is not
    /// clamped to `max`). Pages below 1 become 1. `ceiling` is the deployment
    /// wide maximum and tightens the entity's own.
    pub fn window(page: Option<i64>, limit: Option<i64>, cfg: LimitCfg, ceiling: Option<u64>) -> PageWindow {
        let max = ceiling.map_or(cfg.max, |c| cfg.max.min(c.max(1)));
        let default = cfg.default.min(max);

        let limit = match limit {
            Some(l) if l >= 1 && (l as u64) <= max => l as u64,
            _ => default,
        };
        let page = match page {
            Some(p) if p >= 1 => p as u64,
            _ => 1,
        };
        PageWindow {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    /// `ceil(records / limit)`; zero when there are no records
    pub fn pages(records: u64, limit: u64) -> u64 {
        if limit == 0 {
            return 0;
        }
        records.div_ceil(limit)
    }

    /// `page` and `limit` arrive as numbers or numeric strings
    pub fn parse_integer(key: &str, value: Option<&Value>) -> SearchResult<Option<i64>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| SearchError::invalid(key, format!("expected an integer, got {}", n))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| SearchError::invalid(key, format!("expected an integer, got {}", s))),
            Some(_) => Err(SearchError::invalid(key, "expected an integer")),
        }
    }
}
