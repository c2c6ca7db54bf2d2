use crate::filter::SortDirection;
use crate::schema::{CaseRule, EntitySchema, FieldDef, SchemaError};

/// Personal reminders.
///
/// - limit: default 20, max 100
/// - `title` and `notes` match case-insensitively
pub fn schema() -> Result<EntitySchema, SchemaError> {
    EntitySchema::builder("reminders")
        .field(FieldDef::id("id"))
        .field(FieldDef::id("tenant_id"))
        .field(FieldDef::id("owner_id"))
        .field(FieldDef::text("title", CaseRule::Insensitive).sortable())
        .field(FieldDef::text("notes", CaseRule::Insensitive).nullable())
        .field(FieldDef::enumeration("status", &["pending", "sent", "dismissed"]))
        .field(FieldDef::enumeration("priority", &["low", "normal", "high"]).sortable())
        .field(FieldDef::timestamp("due_at").sortable().nullable())
        .field(FieldDef::timestamp("created_at").sortable())
        .tenant_scope("tenant_id")
        .owner_scope("owner_id")
        .default_sort("created_at", SortDirection::Desc)
        .limits(20, 100)
        .build()
}
