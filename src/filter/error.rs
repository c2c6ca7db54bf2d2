use std::collections::BTreeMap;

use thiserror::Error;

use crate::database::StoreError;

/// Per-field validation messages, keyed by the request key that failed
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search request: {}", summarize(.0))]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    ForbiddenScope(String),

    /// Single-record lookups that miss, including records outside the caller's scope
    #[error("{0} not found")]
    NotFound(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl SearchError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), reason.into());
        SearchError::Validation(errors)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        SearchError::ForbiddenScope(reason.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, SearchError::ForbiddenScope(_))
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, reason)| format!("{}: {}", field, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type SearchResult<T> = Result<T, SearchError>;
