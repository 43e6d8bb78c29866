//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

/// Errors that can occur while loading or saving aggregates.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A required input was missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A stored change has a payload type the aggregate cannot apply.
    #[error("{aggregate_type} has no handler for payload type {payload_type}")]
    TypeMismatch {
        aggregate_type: String,
        payload_type: String,
    },

    /// Another writer advanced the stream first. Reload and retry.
    #[error(transparent)]
    ConcurrencyConflict(EventStoreError),

    /// Any other storage failure.
    #[error("Event store error: {0}")]
    Backend(EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::ConcurrencyConflict(_))
    }
}

impl From<EventStoreError> for DomainError {
    fn from(err: EventStoreError) -> Self {
        if err.is_concurrency_conflict() {
            DomainError::ConcurrencyConflict(err)
        } else {
            DomainError::Backend(err)
        }
    }
}
