pub mod fixture;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

use serde_json::{Map, Value};
use thiserror::Error;

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::{PgStore, SqlResult, SqlWriter};
pub use store::Store;

/// A persisted record as the store hands it back
pub type Row = Map<String, Value>;

/// Errors raised by any `Store` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query timed out after {0} ms")]
    Timeout(u64),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Row decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    /// Failures the caller may retry: the store is unreachable or slow
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Connection(_) | StoreError::Timeout(_) => true,
            StoreError::Sqlx(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }
}
