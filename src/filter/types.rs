use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A single typed value after coercion. `Null` is only produced by the
/// predicate builder (soft-delete exclusion), never by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// JSON rendering used when comparing against stored rows
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Integer(i) => Value::from(*i),
            Scalar::Float(f) => Value::from(*f),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Uuid(u) => Value::String(u.to_string()),
            Scalar::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Uuid(u) => write!(f, "{}", u),
            Scalar::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

/// Normalized filter value for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Exact(Scalar),
    Contains(String),
    Range {
        lower: Option<Scalar>,
        upper: Option<Scalar>,
    },
    Set(Vec<Scalar>),
}

/// Output of the normalizer: only explicitly supplied, non-null fields.
/// Ordered so that predicate trees are built deterministically.
pub type NormalizedFilters = BTreeMap<String, FilterValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Lenient parse: anything other than asc/desc yields `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Asc),
            "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// Sort as the caller asked for it, before allow-list resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortRequest {
    pub field: String,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Concrete ordering: the primary key first, then tiebreakers
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSort {
    pub keys: Vec<SortKey>,
}

impl ResolvedSort {
    pub fn primary(&self) -> &SortKey {
        &self.keys[0]
    }
}

impl fmt::Display for ResolvedSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .keys
            .iter()
            .map(|k| format!("{} {}", k.field, k.direction))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Raw search request as it arrives from HTTP (query string or JSON body).
/// Every field is optional; filter values are left untyped until normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub page: Option<Value>,
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default, alias = "direction")]
    pub order: Option<String>,
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl SearchRequest {
    pub const RESERVED_KEYS: &'static [&'static str] = &["page", "limit", "sort", "order", "direction"];

    /// Build from query-string pairs; every value arrives as a string
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = SearchRequest::default();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            match key.as_str() {
                "page" => request.page = Some(Value::String(value)),
                "limit" => request.limit = Some(Value::String(value)),
                "sort" => request.sort = Some(value),
                "order" | "direction" => request.order = Some(value),
                // Repeated keys collect into a list
                _ => match request.filters.get_mut(&key) {
                    Some(Value::Array(items)) => items.push(Value::String(value)),
                    Some(existing) => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, Value::String(value)]);
                    }
                    None => {
                        request.filters.insert(key, Value::String(value));
                    }
                },
            }
        }
        request
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_page(mut self, page: i64, limit: i64) -> Self {
        self.page = Some(Value::from(page));
        self.limit = Some(Value::from(limit));
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self.order = Some(order.into());
        self
    }

    /// Split `sort` into field and direction. Accepts `field`, `field desc`
    /// and `-field`; an explicit `order` wins over an inline direction.
    pub fn sort_request(&self) -> Option<SortRequest> {
        let raw = self.sort.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let mut parts = raw.split_whitespace();
        let head = parts.next()?;
        let inline = parts.next().map(str::to_string);
        let (field, inline) = match head.strip_prefix('-') {
            Some(stripped) => (stripped.to_string(), Some("desc".to_string())),
            None => (head.to_string(), inline),
        };
        let direction = self
            .order
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or(inline);
        Some(SortRequest { field, direction })
    }
}

/// Backend-agnostic predicate tree. Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateNode {
    Equals {
        field: String,
        value: Scalar,
    },
    Contains {
        field: String,
        needle: String,
        case_insensitive: bool,
    },
    Range {
        field: String,
        lower: Option<Scalar>,
        upper: Option<Scalar>,
    },
    In {
        field: String,
        values: Vec<Scalar>,
    },
    And(Vec<PredicateNode>),
}

impl PredicateNode {
    pub fn equals(field: impl Into<String>, value: Scalar) -> Self {
        PredicateNode::Equals { field: field.into(), value }
    }

    /// Fields referenced anywhere in the tree
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            PredicateNode::Equals { field, .. }
            | PredicateNode::Contains { field, .. }
            | PredicateNode::Range { field, .. }
            | PredicateNode::In { field, .. } => out.push(field),
            PredicateNode::And(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
        }
    }

    /// Operator/field outline without any values, safe to log
    pub fn shape(&self) -> String {
        match self {
            PredicateNode::Equals { field, value } if value.is_null() => format!("null({})", field),
            PredicateNode::Equals { field, .. } => format!("eq({})", field),
            PredicateNode::Contains { field, case_insensitive, .. } => {
                if *case_insensitive {
                    format!("icontains({})", field)
                } else {
                    format!("contains({})", field)
                }
            }
            PredicateNode::Range { field, lower, upper } => format!(
                "range({},{}{})",
                field,
                if lower.is_some() { "from" } else { "" },
                if upper.is_some() { "..to" } else { "" }
            ),
            PredicateNode::In { field, values } => format!("in({},#{})", field, values.len()),
            PredicateNode::And(children) => {
                let inner: Vec<String> = children.iter().map(|c| c.shape()).collect();
                format!("and({})", inner.join(","))
            }
        }
    }
}
