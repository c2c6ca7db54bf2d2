//! Filter normalization: untyped request values → typed `FilterValue`s.
//!
//! Keys are resolved against the entity's field table. Absent, `null` and
//! blank values are dropped; everything else is coerced to the field's kind or
//! reported as a validation error. All errors for a request are collected so
//! the caller sees every bad field at once.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::{FieldErrors, SearchError, SearchResult};
use super::types::{FilterValue, NormalizedFilters, Scalar};
use crate::schema::{EntitySchema, FieldDef, FieldKind, FilterMode, UnknownFieldPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Whole,
    Lower,
    Upper,
}

pub fn normalize(schema: &EntitySchema, filters: &Map<String, Value>) -> SearchResult<NormalizedFilters> {
    let mut out = NormalizedFilters::new();
    let mut errors = FieldErrors::new();

    for (key, raw) in filters {
        if raw.is_null() {
            continue;
        }

        let (field, mode, bound) = match resolve_key(schema, key) {
            Resolved::Field(field, mode, bound) => (field, mode, bound),
            Resolved::NotFilterable => {
                if schema.unknown_filters == UnknownFieldPolicy::Reject {
                    errors.insert(key.clone(), "field is not filterable".to_string());
                }
                continue;
            }
            Resolved::Unknown => {
                if schema.unknown_filters == UnknownFieldPolicy::Reject {
                    errors.insert(key.clone(), "unknown filter field".to_string());
                } else {
                    tracing::debug!(entity = %schema.name, key = %key, "ignoring unknown filter field");
                }
                continue;
            }
        };

        let value = match normalize_value(field, mode, bound, raw) {
            Ok(Some(value)) => value,
            Ok(None) => continue,
            Err(reason) => {
                errors.insert(key.clone(), reason);
                continue;
            }
        };

        if let Err(reason) = merge(&mut out, &field.name, value) {
            errors.insert(key.clone(), reason);
        }
    }

    for (name, value) in &out {
        if let FilterValue::Range { lower: Some(lower), upper: Some(upper) } = value {
            if compare_bounds(lower, upper) == Some(std::cmp::Ordering::Greater) {
                errors.insert(name.clone(), "range lower bound is greater than upper bound".to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(SearchError::Validation(errors))
    }
}

enum Resolved<'a> {
    Field(&'a FieldDef, FilterMode, Bound),
    NotFilterable,
    Unknown,
}

fn resolve_key<'a>(schema: &'a EntitySchema, key: &str) -> Resolved<'a> {
    // Internal fields are invisible to callers, filters included
    if let Some(field) = schema.field(key).filter(|f| f.public) {
        return match field.filter {
            Some(mode) => Resolved::Field(field, mode, Bound::Whole),
            None => Resolved::NotFilterable,
        };
    }

    let suffixed = key
        .strip_suffix("_from")
        .map(|base| (base, Bound::Lower))
        .or_else(|| key.strip_suffix("_to").map(|base| (base, Bound::Upper)));

    match suffixed.and_then(|(base, bound)| schema.field(base).filter(|f| f.public).map(|f| (f, bound))) {
        Some((field, bound)) if field.filter == Some(FilterMode::Range) => {
            Resolved::Field(field, FilterMode::Range, bound)
        }
        Some(_) => Resolved::NotFilterable,
        None => Resolved::Unknown,
    }
}

fn normalize_value(
    field: &FieldDef,
    mode: FilterMode,
    bound: Bound,
    raw: &Value,
) -> Result<Option<FilterValue>, String> {
    match mode {
        FilterMode::Exact => Ok(coerce(&field.kind, raw, bound)?.map(FilterValue::Exact)),
        FilterMode::Contains(_) => match raw {
            Value::String(s) => {
                let trimmed = s.trim();
                Ok((!trimmed.is_empty()).then(|| FilterValue::Contains(trimmed.to_string())))
            }
            Value::Number(n) => Ok(Some(FilterValue::Contains(n.to_string()))),
            _ => Err("expected text".to_string()),
        },
        FilterMode::Range => {
            let Some(scalar) = coerce(&field.kind, raw, bound)? else {
                return Ok(None);
            };
            Ok(Some(match bound {
                Bound::Whole => FilterValue::Exact(scalar),
                Bound::Lower => FilterValue::Range { lower: Some(scalar), upper: None },
                Bound::Upper => FilterValue::Range { lower: None, upper: Some(scalar) },
            }))
        }
        FilterMode::OneOf => {
            let items: Vec<Value> = match raw {
                Value::Array(items) => items.clone(),
                Value::String(s) => s.split(',').map(|part| Value::String(part.to_string())).collect(),
                other => vec![other.clone()],
            };
            let mut values = Vec::with_capacity(items.len());
            for item in &items {
                if item.is_array() || item.is_object() {
                    return Err("expected a list of scalar values".to_string());
                }
                if let Some(scalar) = coerce(&field.kind, item, Bound::Whole)? {
                    if !values.contains(&scalar) {
                        values.push(scalar);
                    }
                }
            }
            Ok((!values.is_empty()).then_some(FilterValue::Set(values)))
        }
    }
}

/// `_from` and `_to` land on the same field and fold into one range
fn merge(out: &mut NormalizedFilters, field: &str, value: FilterValue) -> Result<(), String> {
    match (out.remove(field), value) {
        (None, value) => {
            out.insert(field.to_string(), value);
            Ok(())
        }
        (
            Some(FilterValue::Range { lower: l1, upper: u1 }),
            FilterValue::Range { lower: l2, upper: u2 },
        ) => {
            out.insert(
                field.to_string(),
                FilterValue::Range { lower: l1.or(l2), upper: u1.or(u2) },
            );
            Ok(())
        }
        (Some(existing), _) => {
            out.insert(field.to_string(), existing);
            Err(format!("cannot combine an exact value and a range on '{}'", field))
        }
    }
}

fn compare_bounds(a: &Scalar, b: &Scalar) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Scalar::Integer(x), Scalar::Integer(y)) => Some(x.cmp(y)),
        (Scalar::Float(x), Scalar::Float(y)) => x.partial_cmp(y),
        (Scalar::Timestamp(x), Scalar::Timestamp(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Coerce one raw value to `kind`. `Ok(None)` means "treat as absent".
fn coerce(kind: &FieldKind, raw: &Value, bound: Bound) -> Result<Option<Scalar>, String> {
    let text = match raw {
        Value::Null => return Ok(None),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.to_string()
        }
        Value::Number(n) => {
            return match kind {
                FieldKind::Integer => n
                    .as_i64()
                    .map(|i| Some(Scalar::Integer(i)))
                    .ok_or_else(|| format!("expected an integer, got {}", n)),
                FieldKind::Float => n
                    .as_f64()
                    .map(|f| Some(Scalar::Float(f)))
                    .ok_or_else(|| format!("expected a number, got {}", n)),
                FieldKind::Text => Ok(Some(Scalar::Text(n.to_string()))),
                other => Err(format!("expected {}, got a number", other.name())),
            };
        }
        Value::Bool(b) => {
            return match kind {
                FieldKind::Bool => Ok(Some(Scalar::Bool(*b))),
                other => Err(format!("expected {}, got a boolean", other.name())),
            };
        }
        Value::Array(_) | Value::Object(_) => return Err("expected a single value".to_string()),
    };

    let scalar = match kind {
        FieldKind::Text => Scalar::Text(text),
        FieldKind::Id => Uuid::parse_str(&text)
            .map(Scalar::Uuid)
            .map_err(|_| format!("invalid identifier: {}", text))?,
        FieldKind::Integer => text
            .parse::<i64>()
            .map(Scalar::Integer)
            .map_err(|_| format!("expected an integer, got {}", text))?,
        FieldKind::Float => match text.parse::<f64>() {
            Ok(f) if f.is_finite() => Scalar::Float(f),
            _ => return Err(format!("expected a number, got {}", text)),
        },
        FieldKind::Bool => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Scalar::Bool(true),
            "false" | "0" => Scalar::Bool(false),
            _ => return Err(format!("expected true or false, got {}", text)),
        },
        FieldKind::Timestamp => Scalar::Timestamp(parse_timestamp(&text, bound)?),
        FieldKind::Enum(variants) => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(&text))
            .map(|v| Scalar::Text(v.clone()))
            .ok_or_else(|| format!("expected one of [{}], got {}", variants.join(", "), text))?,
    };
    Ok(Some(scalar))
}

/// RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare date.
/// A bare date used as an upper bound covers the whole day.
fn parse_timestamp(text: &str, bound: Bound) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        return Ok(match bound {
            Bound::Upper => start + Duration::days(1) - Duration::nanoseconds(1),
            Bound::Lower | Bound::Whole => start,
        });
    }
    Err(format!("invalid timestamp: {}", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CaseRule, EntitySchema, FieldDef};
    use serde_json::json;

    fn schema(policy: UnknownFieldPolicy) -> EntitySchema {
        EntitySchema::builder("sessions")
            .field(FieldDef::id("id"))
            .field(FieldDef::id("patient_id"))
            .field(FieldDef::text("notes", CaseRule::Insensitive))
            .field(FieldDef::integer("duration_minutes").sortable())
            .field(FieldDef::enumeration("status", &["scheduled", "completed", "cancelled"]))
            .field(FieldDef::flag("recorded"))
            .field(FieldDef::timestamp("created_at").sortable())
            .field(FieldDef::keyword("internal_code").unfiltered())
            .field(FieldDef::keyword("secret_hash").internal())
            .unknown_filters(policy)
            .build()
            .unwrap()
    }

    fn filters(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn field_errors(err: SearchError) -> FieldErrors {
        match err {
            SearchError::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn empty_request_is_valid() {
        let out = normalize(&schema(UnknownFieldPolicy::Reject), &Map::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn drops_null_and_blank_values_and_trims_strings() {
        let out = normalize(
            &schema(UnknownFieldPolicy::Reject),
            &filters(json!({ "notes": "  follow up  ", "patient_id": null, "status": "   " })),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out["notes"], FilterValue::Contains("follow up".to_string()));
    }

    #[test]
    fn folds_from_and_to_into_one_range() {
        let out = normalize(
            &schema(UnknownFieldPolicy::Reject),
            &filters(json!({ "duration_minutes_from": "15", "duration_minutes_to": 60 })),
        )
        .unwrap();
        assert_eq!(
            out["duration_minutes"],
            FilterValue::Range { lower: Some(Scalar::Integer(15)), upper: Some(Scalar::Integer(60)) }
        );
    }

    #[test]
    fn date_only_upper_bound_covers_the_day() {
        let out = normalize(
            &schema(UnknownFieldPolicy::Reject),
            &filters(json!({ "created_at_from": "2024-03-01", "created_at_to": "2024-03-01" })),
        )
        .unwrap();
        match &out["created_at"] {
            FilterValue::Range { lower: Some(Scalar::Timestamp(lo)), upper: Some(Scalar::Timestamp(hi)) } => {
                assert_eq!(lo.to_rfc3339(), "2024-03-01T00:00:00+00:00");
                assert_eq!(hi.timestamp_millis() - lo.timestamp_millis(), 86_399_999);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_non_numeric_and_bad_dates() {
        let errors = field_errors(
            normalize(
                &schema(UnknownFieldPolicy::Reject),
                &filters(json!({
                    "duration_minutes_from": "ten",
                    "created_at_to": "yesterday",
                    "patient_id": "not-a-uuid",
                    "recorded": "maybe"
                })),
            )
            .unwrap_err(),
        );
        assert_eq!(errors.len(), 4);
        assert!(errors.contains_key("duration_minutes_from"));
        assert!(errors.contains_key("created_at_to"));
        assert!(errors.contains_key("patient_id"));
        assert!(errors.contains_key("recorded"));
    }

    #[test]
    fn rejects_inverted_range() {
        let errors = field_errors(
            normalize(
                &schema(UnknownFieldPolicy::Reject),
                &filters(json!({ "duration_minutes_from": 90, "duration_minutes_to": 30 })),
            )
            .unwrap_err(),
        );
        assert!(errors.contains_key("duration_minutes"));
    }

    #[test]
    fn enum_sets_from_arrays_and_comma_lists() {
        let s = schema(UnknownFieldPolicy::Reject);
        let from_array = normalize(&s, &filters(json!({ "status": ["scheduled", "Completed"] }))).unwrap();
        let from_csv = normalize(&s, &filters(json!({ "status": "scheduled, completed" }))).unwrap();
        let expected = FilterValue::Set(vec![
            Scalar::Text("scheduled".into()),
            Scalar::Text("completed".into()),
        ]);
        assert_eq!(from_array["status"], expected);
        assert_eq!(from_csv["status"], expected);

        let errors = field_errors(normalize(&s, &filters(json!({ "status": ["archived"] }))).unwrap_err());
        assert!(errors["status"].contains("expected one of"));
    }

    #[test]
    fn unknown_fields_follow_entity_policy() {
        let request = filters(json!({ "colour": "red", "internal_code": "X1", "secret_hash": "abc" }));

        let errors = field_errors(normalize(&schema(UnknownFieldPolicy::Reject), &request).unwrap_err());
        assert_eq!(errors["colour"], "unknown filter field");
        assert_eq!(errors["internal_code"], "field is not filterable");
        assert_eq!(errors["secret_hash"], "unknown filter field");

        let out = normalize(&schema(UnknownFieldPolicy::Ignore), &request).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn exact_and_range_on_same_field_conflict() {
        let errors = field_errors(
            normalize(
                &schema(UnknownFieldPolicy::Reject),
                &filters(json!({ "duration_minutes": 30, "duration_minutes_from": 10 })),
            )
            .unwrap_err(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn bare_date_upper_bound_covers_sub_millisecond_times() {
        let utc = |text: &str| DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc);

        let upper = parse_timestamp("2024-01-07", Bound::Upper).unwrap();
        assert!(utc("2024-01-07T23:59:59.999999Z") <= upper);
        assert!(upper < utc("2024-01-08T00:00:00Z"));
        assert_eq!(parse_timestamp("2024-01-07", Bound::Lower).unwrap(), utc("2024-01-07T00:00:00Z"));
    }
}
