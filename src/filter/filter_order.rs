use super::types::{ResolvedSort, SortDirection, SortKey, SortRequest};
use crate::schema::{EntitySchema, FieldKind};

pub struct FilterOrder;

impl FilterOrder {
    /// Resolve the caller's sort against the entity allow-list.
    ///
    /// An allow-listed field keeps the requested direction (`desc` when the
    /// direction is missing or unreadable). Anything else silently becomes the
    /// entity's default sort. The entity's tiebreakers are appended in the
    /// primary direction so that every ordering is total.
    pub fn resolve(schema: &EntitySchema, requested: Option<&SortRequest>) -> ResolvedSort {
        let primary = match requested {
            Some(req) if schema.is_sortable(&req.field) => SortKey {
                field: req.field.clone(),
                direction: req
                    .direction
                    .as_deref()
                    .and_then(SortDirection::parse)
                    .unwrap_or(SortDirection::Desc),
            },
            Some(req) => {
                tracing::debug!(
                    entity = %schema.name,
                    requested = %req.field,
                    fallback = %schema.default_sort.field,
                    "sort field not allowed, using default"
                );
                schema.default_sort.clone()
            }
            None => schema.default_sort.clone(),
        };

        let direction = primary.direction;
        let mut keys = vec![primary];
        for field in &schema.tiebreakers {
            if keys.iter().all(|k| &k.field != field) {
                keys.push(SortKey { field: field.clone(), direction });
            }
        }
        ResolvedSort { keys }
    }

    /// Enum columns sort by their text value, as the memory store does,
    /// rather than by Postgres enum declaration order.
    pub fn generate(schema: &EntitySchema, sort: &ResolvedSort) -> String {
        let parts: Vec<String> = sort
            .keys
            .iter()
            .map(|k| match schema.kind_of(&k.field) {
                Some(FieldKind::Enum(_)) => format!("\"{}\"::text {} NULLS LAST", k.field, k.direction.to_sql()),
                _ => format!("\"{}\" {} NULLS LAST", k.field, k.direction.to_sql()),
            })
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CaseRule, FieldDef};

    fn schema() -> EntitySchema {
        EntitySchema::builder("tags")
            .field(FieldDef::id("id"))
            .field(FieldDef::text("name", CaseRule::Insensitive).sortable())
            .field(FieldDef::keyword("secret_hash").internal())
            .field(FieldDef::timestamp("created_at").sortable())
            .build()
            .unwrap()
    }

    fn request(field: &str, direction: Option<&str>) -> SortRequest {
        SortRequest { field: field.to_string(), direction: direction.map(str::to_string) }
    }

    #[test]
    fn allowed_field_keeps_direction_and_gets_tiebreakers() {
        let sort = FilterOrder::resolve(&schema(), Some(&request("name", Some("asc"))));
        let fields: Vec<_> = sort.keys.iter().map(|k| k.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "created_at", "id"]);
        assert!(sort.keys.iter().all(|k| k.direction == SortDirection::Asc));
    }

    #[test]
    fn missing_or_invalid_direction_defaults_to_desc() {
        let sort = FilterOrder::resolve(&schema(), Some(&request("name", None)));
        assert_eq!(sort.primary().direction, SortDirection::Desc);
        let sort = FilterOrder::resolve(&schema(), Some(&request("name", Some("sideways"))));
        assert_eq!(sort.primary().direction, SortDirection::Desc);
    }

    #[test]
    fn unknown_or_internal_field_falls_back_to_default() {
        for field in ["secret_hash", "name; DROP TABLE tags", "nope"] {
            let sort = FilterOrder::resolve(&schema(), Some(&request(field, Some("asc"))));
            assert_eq!(sort.primary().field, "created_at");
            assert_eq!(sort.primary().direction, SortDirection::Desc);
        }
    }

    #[test]
    fn tiebreaker_is_not_repeated() {
        let sort = FilterOrder::resolve(&schema(), None);
        let fields: Vec<_> = sort.keys.iter().map(|k| k.field.as_str()).collect();
        assert_eq!(fields, vec!["created_at", "id"]);
    }

    #[test]
    fn generates_order_clause() {
        let sort = FilterOrder::resolve(&schema(), Some(&request("name", Some("asc"))));
        assert_eq!(
            FilterOrder::generate(&schema(), &sort),
            "ORDER BY \"name\" ASC NULLS LAST, \"created_at\" ASC NULLS LAST, \"id\" ASC NULLS LAST"
        );
    }

    #[test]
    fn enum_columns_sort_as_text() {
        let schema = EntitySchema::builder("reminders")
            .field(FieldDef::id("id"))
            .field(FieldDef::enumeration("priority", &["low", "normal", "high"]).sortable())
            .field(FieldDef::timestamp("created_at").sortable())
            .build()
            .unwrap();
        let sort = FilterOrder::resolve(&schema, Some(&request("priority", Some("desc"))));
        assert_eq!(
            FilterOrder::generate(&schema, &sort),
            "ORDER BY \"priority\"::text DESC NULLS LAST, \"created_at\" DESC NULLS LAST, \"id\" DESC NULLS LAST"
        );
    }
}
