use crate::filter::SortDirection;
use crate::schema::{CaseRule, EntitySchema, FieldDef, SchemaError};

/// Video consultations. Clinics are organizations; the patient owns the
/// session. Clinical notes stay internal to the summary.
///
/// - limit: default 10, max 50
/// - `topic` matches case-sensitively
pub fn schema() -> Result<EntitySchema, SchemaError> {
    EntitySchema::builder("telemedicine_sessions")
        .field(FieldDef::id("id"))
        .field(FieldDef::id("tenant_id"))
        .field(FieldDef::id("organization_id"))
        .field(FieldDef::id("patient_id"))
        .field(FieldDef::id("provider_id"))
        .field(FieldDef::text("topic", CaseRule::Sensitive))
        .field(FieldDef::enumeration(
            "status",
            &["scheduled", "in_progress", "completed", "cancelled", "no_show"],
        ))
        .field(FieldDef::timestamp("scheduled_at").sortable())
        .field(FieldDef::timestamp("ended_at").sortable().nullable())
        .field(FieldDef::integer("duration_minutes").sortable().nullable())
        .field(FieldDef::keyword("room_code").internal())
        .field(FieldDef::text("clinical_notes", CaseRule::Insensitive).internal().unfiltered())
        .field(FieldDef::timestamp("created_at").sortable())
        .tenant_scope("tenant_id")
        .organization_scope("organization_id")
        .owner_scope("patient_id")
        .default_sort("scheduled_at", SortDirection::Desc)
        .tiebreakers(&["created_at", "id"])
        .limits(10, 50)
        .build()
}
