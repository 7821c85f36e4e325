//! Errors returned by the repositories

use std::time::Duration;

use folio_core::ValidationError;

use crate::store::{StoreError, StoreErrorKind};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("malformed {entity} row: {source}")]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        resource: &'static str,
        id: String,
        from: String,
        to: String,
    },

    /// The join-table stage of a project write failed
    #[error("linking technologies to project '{project_id}' failed: {source}")]
    Link {
        project_id: String,
        #[source]
        source: StoreError,
    },
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Underlying store error, if this error came from the store
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) | Self::Link { source: err, .. } => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors the retry wrapper can classify
pub trait Retryable: std::error::Error {
    /// Worth another attempt: the same call may succeed later.
    fn is_transient(&self) -> bool;

    /// Error standing in for an attempt that exceeded its time budget
    fn timed_out(limit: Duration) -> Self;
}

impl Retryable for StoreError {
    fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    fn timed_out(limit: Duration) -> Self {
        StoreError::new(
            StoreErrorKind::Timeout,
            format!("no response within {}ms", limit.as_millis()),
        )
    }
}

impl Retryable for DbError {
    fn is_transient(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_transient)
    }

    fn timed_out(limit: Duration) -> Self {
        Self::Store(StoreError::timed_out(limit))
    }
}
