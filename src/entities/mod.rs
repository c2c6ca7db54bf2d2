//! Concrete entity tables for the recurring list/search endpoints.
//!
//! Page sizes and substring case rules differ between entities; each module
//! documents its own.

pub mod audit_events;
pub mod job_postings;
pub mod notification_deliveries;
pub mod reminders;
pub mod tags;
pub mod telemedicine_sessions;

use crate::schema::{EntitySchema, SchemaError};

pub fn all() -> Result<Vec<EntitySchema>, SchemaError> {
    Ok(vec![
        audit_events::schema()?,
        job_postings::schema()?,
        notification_deliveries::schema()?,
        reminders::schema()?,
        tags::schema()?,
        telemedicine_sessions::schema()?,
    ])
}
