use crate::filter::SortDirection;
use crate::schema::{CaseRule, EntitySchema, FieldDef, SchemaError, UnknownFieldPolicy};

/// Outbound notification attempts, owned by the recipient. Unknown filter
/// keys are ignored rather than rejected: clients of this listing send
/// tracking parameters along with their filters.
///
/// - limit: default 20, max 100
/// - `subject` matches case-insensitively
pub fn schema() -> Result<EntitySchema, SchemaError> {
    EntitySchema::builder("notification_deliveries")
        .field(FieldDef::id("id"))
        .field(FieldDef::id("tenant_id"))
        .field(FieldDef::id("recipient_id"))
        .field(FieldDef::enumeration("channel", &["email", "sms", "push", "in_app"]))
        .field(FieldDef::enumeration("status", &["queued", "sent", "delivered", "failed"]).sortable())
        .field(FieldDef::text("subject", CaseRule::Insensitive))
        .field(FieldDef::integer("attempts").sortable())
        .field(FieldDef::timestamp("sent_at").sortable().nullable())
        .field(FieldDef::keyword("provider_message_id").internal())
        .field(FieldDef::timestamp("created_at").sortable())
        .tenant_scope("tenant_id")
        .owner_scope("recipient_id")
        .default_sort("created_at", SortDirection::Desc)
        .limits(20, 100)
        .unknown_filters(UnknownFieldPolicy::Ignore)
        .build()
}
