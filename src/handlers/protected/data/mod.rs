pub mod record_get;
pub mod schema_get;

pub use record_get::record_get;
pub use schema_get::schema_get;
