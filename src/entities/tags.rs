use crate::filter::SortDirection;
use crate::schema::{CaseRule, EntitySchema, FieldDef, SchemaError};
use crate::scope::{Role, ScopeClaim, ScopeRule};

/// Tags are shared across a tenant, so members and organization admins see
/// every tag of their tenant rather than only their own.
///
/// - limit: default 50, max 100
/// - `name` matches case-insensitively
pub fn schema() -> Result<EntitySchema, SchemaError> {
    EntitySchema::builder("tags")
        .field(FieldDef::id("id"))
        .field(FieldDef::id("tenant_id"))
        .field(FieldDef::id("created_by"))
        .field(FieldDef::text("name", CaseRule::Insensitive).sortable())
        .field(FieldDef::keyword("color").nullable())
        .field(FieldDef::integer("usage_count").sortable())
        .field(FieldDef::timestamp("created_at").sortable())
        .field(FieldDef::timestamp("updated_at").sortable())
        .tenant_scope("tenant_id")
        .owner_scope("created_by")
        .default_sort("name", SortDirection::Asc)
        .limits(50, 100)
        .override_role(Role::Member, ScopeRule::Scoped(vec![ScopeClaim::Tenant]))
        .override_role(Role::OrgAdmin, ScopeRule::Scoped(vec![ScopeClaim::Tenant]))
        .build()
}
