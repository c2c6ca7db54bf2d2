use crate::filter::SortDirection;
use crate::schema::{EntitySchema, FieldDef, SchemaError};
use crate::scope::{Role, ScopeRule};

/// Append-only audit trail. Rows are never soft-deleted, and members may not
/// read it at all. Applicants are refused because the trail has no owner
/// column.
///
/// - limit: default 50, max 200
/// - no substring filters
pub fn schema() -> Result<EntitySchema, SchemaError> {
    EntitySchema::builder("audit_events")
        .field(FieldDef::id("id"))
        .field(FieldDef::id("tenant_id"))
        .field(FieldDef::id("organization_id").nullable())
        .field(FieldDef::id("actor_id"))
        .field(FieldDef::keyword("action").sortable())
        .field(FieldDef::enumeration(
            "resource_type",
            &["user", "organization", "record", "session", "setting"],
        ))
        .field(FieldDef::id("resource_id").nullable())
        .field(FieldDef::keyword("ip_address").internal())
        .field(FieldDef::timestamp("occurred_at").sortable())
        .tenant_scope("tenant_id")
        .organization_scope("organization_id")
        .soft_delete(None)
        .default_sort("occurred_at", SortDirection::Desc)
        .tiebreakers(&["occurred_at", "id"])
        .limits(50, 200)
        .override_role(Role::Member, ScopeRule::Deny)
        .build()
}
