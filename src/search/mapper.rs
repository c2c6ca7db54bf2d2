use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::database::{Row, StoreError};
use crate::schema::{EntitySchema, FieldKind};

/// Row → public summary. Keeps only the entity's public fields, emits nullable
/// ones as an explicit null when the row lacks them and renders every timestamp
/// as RFC 3339 UTC with millisecond precision. Never touches the store.
pub struct RowMapper;

impl RowMapper {
    pub fn map(schema: &EntitySchema, mut row: Row) -> Result<Value, StoreError> {
        let mut out = Map::new();
        for field in schema.public_fields() {
            let value = match row.remove(&field.name) {
                Some(value) => value,
                None if field.nullable => Value::Null,
                None => continue,
            };
            let value = match (&field.kind, value) {
                (FieldKind::Timestamp, Value::String(raw)) => Value::String(
                    canonical_timestamp(&raw)
                        .ok_or_else(|| StoreError::Decode(format!("{}.{}: invalid timestamp", schema.name, field.name)))?,
                ),
                (_, value) => value,
            };
            out.insert(field.name.clone(), value);
        }
        Ok(Value::Object(out))
    }

    pub fn map_all(schema: &EntitySchema, rows: Vec<Row>) -> Result<Vec<Value>, StoreError> {
        rows.into_iter().map(|row| Self::map(schema, row)).collect()
    }
}

/// Accepts RFC 3339 and the offset-less form Postgres emits for
/// `timestamp without time zone` (taken as UTC)
fn canonical_timestamp(raw: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        })?;
    Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}
