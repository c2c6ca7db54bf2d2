use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Row, Store, StoreError};
use crate::filter::{PageWindow, PredicateNode, ResolvedSort, Scalar, SortDirection};
use crate::schema::{EntitySchema, FieldKind};

/// In-process store with the same predicate and ordering semantics as
/// `PgStore`. Used for tests and for running the server from fixtures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: HashMap<String, Vec<Row>>) -> Self {
        Self { tables: RwLock::new(tables) }
    }

    pub async fn insert(&self, table: &str, row: Row) {
        self.tables.write().await.entry(table.to_string()).or_default().push(row);
    }

    pub async fn insert_many(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.values().all(Vec::is_empty)
    }

    fn matching<'a>(schema: &EntitySchema, predicate: &PredicateNode, rows: &'a [Row]) -> Vec<&'a Row> {
        rows.iter().filter(|row| satisfies(schema, predicate, row)).collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn count(&self, schema: &EntitySchema, predicate: &PredicateNode) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables.get(&schema.table).map(Vec::as_slice).unwrap_or_default();
        Ok(Self::matching(schema, predicate, rows).len() as u64)
    }

    async fn fetch(
        &self,
        schema: &EntitySchema,
        predicate: &PredicateNode,
        sort: &ResolvedSort,
        window: PageWindow,
    ) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables.get(&schema.table).map(Vec::as_slice).unwrap_or_default();

        let mut hits = Self::matching(schema, predicate, rows);
        hits.sort_by(|a, b| compare_rows(schema, sort, a, b));

        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        Ok(hits.into_iter().skip(offset).take(limit).cloned().collect())
    }
}

fn satisfies(schema: &EntitySchema, node: &PredicateNode, row: &Row) -> bool {
    match node {
        PredicateNode::And(children) => children.iter().all(|c| satisfies(schema, c, row)),
        PredicateNode::Equals { field, value } => {
            let stored = stored_scalar(schema, row, field);
            if value.is_null() {
                return stored.is_null();
            }
            compare(&stored, value) == Some(Ordering::Equal)
        }
        PredicateNode::Contains { field, needle, case_insensitive } => match row.get(field) {
            Some(Value::String(text)) => {
                if *case_insensitive {
                    text.to_lowercase().contains(&needle.to_lowercase())
                } else {
                    text.contains(needle.as_str())
                }
            }
            _ => false,
        },
        PredicateNode::Range { field, lower, upper } => {
            let stored = stored_scalar(schema, row, field);
            if stored.is_null() {
                return false;
            }
            let above = lower
                .as_ref()
                .map_or(true, |l| matches!(compare(&stored, l), Some(Ordering::Greater | Ordering::Equal)));
            let below = upper
                .as_ref()
                .map_or(true, |u| matches!(compare(&stored, u), Some(Ordering::Less | Ordering::Equal)));
            above && below
        }
        PredicateNode::In { field, values } => {
            let stored = stored_scalar(schema, row, field);
            values.iter().any(|v| compare(&stored, v) == Some(Ordering::Equal))
        }
    }
}

fn compare_rows(schema: &EntitySchema, sort: &ResolvedSort, a: &Row, b: &Row) -> Ordering {
    for key in &sort.keys {
        let left = stored_scalar(schema, a, &key.field);
        let right = stored_scalar(schema, b, &key.field);
        // Nulls last in both directions
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = compare(&left, &right).unwrap_or(Ordering::Equal);
                match key.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Read a row value as the scalar type its field declares. Values that do not
/// fit the declared kind compare as text so they never match typed filters.
fn stored_scalar(schema: &EntitySchema, row: &Row, field: &str) -> Scalar {
    let value = match row.get(field) {
        None | Some(Value::Null) => return Scalar::Null,
        Some(value) => value,
    };

    match (schema.kind_of(field), value) {
        (Some(FieldKind::Id), Value::String(s)) => {
            Uuid::parse_str(s).map(Scalar::Uuid).unwrap_or_else(|_| Scalar::Text(s.clone()))
        }
        (Some(FieldKind::Timestamp), Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|ts| Scalar::Timestamp(ts.with_timezone(&Utc)))
            .unwrap_or_else(|_| Scalar::Text(s.clone())),
        (Some(FieldKind::Float), Value::Number(n)) => n.as_f64().map(Scalar::Float).unwrap_or(Scalar::Null),
        (_, Value::Number(n)) => match n.as_i64() {
            Some(i) => Scalar::Integer(i),
            None => n.as_f64().map(Scalar::Float).unwrap_or(Scalar::Null),
        },
        (_, Value::Bool(b)) => Scalar::Bool(*b),
        (_, Value::String(s)) => Scalar::Text(s.clone()),
        (_, other) => Scalar::Text(other.to_string()),
    }
}

fn compare(a: &Scalar, b: &Scalar) -> Option<Ordering> {
    match (a, b) {
        (Scalar::Text(x), Scalar::Text(y)) => Some(x.cmp(y)),
        (Scalar::Integer(x), Scalar::Integer(y)) => Some(x.cmp(y)),
        (Scalar::Float(x), Scalar::Float(y)) => x.partial_cmp(y),
        (Scalar::Integer(x), Scalar::Float(y)) => (*x as f64).partial_cmp(y),
        (Scalar::Float(x), Scalar::Integer(y)) => x.partial_cmp(&(*y as f64)),
        (Scalar::Bool(x), Scalar::Bool(y)) => Some(x.cmp(y)),
        (Scalar::Uuid(x), Scalar::Uuid(y)) => Some(x.cmp(y)),
        (Scalar::Timestamp(x), Scalar::Timestamp(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
