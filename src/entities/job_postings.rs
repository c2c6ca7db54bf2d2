use crate::filter::SortDirection;
use crate::schema::{CaseRule, EntitySchema, FieldDef, SchemaError};
use crate::scope::{Role, ScopeClaim, ScopeRule};

/// Recruitment postings, owned by the organization that publishes them.
/// Applicants browse every posting of the job board (tenant) they signed up
/// on.
///
/// - limit: default 25, max 100
/// - `title` matches case-sensitively, `location` case-insensitively
pub fn schema() -> Result<EntitySchema, SchemaError> {
    EntitySchema::builder("job_postings")
        .field(FieldDef::id("id"))
        .field(FieldDef::id("tenant_id"))
        .field(FieldDef::id("organization_id"))
        .field(FieldDef::id("posted_by"))
        .field(FieldDef::text("title", CaseRule::Sensitive).sortable())
        .field(FieldDef::text("location", CaseRule::Insensitive).sortable().nullable())
        .field(FieldDef::enumeration("state", &["draft", "open", "closed", "archived"]))
        .field(FieldDef::enumeration(
            "employment_type",
            &["full_time", "part_time", "contract", "internship"],
        ))
        .field(FieldDef::integer("salary_min").sortable().nullable())
        .field(FieldDef::integer("salary_max").sortable().nullable())
        .field(FieldDef::flag("remote"))
        .field(FieldDef::timestamp("published_at").sortable().nullable())
        .field(FieldDef::timestamp("created_at").sortable())
        .tenant_scope("tenant_id")
        .organization_scope("organization_id")
        .owner_scope("posted_by")
        .default_sort("created_at", SortDirection::Desc)
        .limits(25, 100)
        .override_role(Role::Applicant, ScopeRule::Scoped(vec![ScopeClaim::Tenant]))
        .build()
}
