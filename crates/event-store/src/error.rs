use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Another writer advanced the stream past the version this writer started
    /// from. Raised both by the version pre-check and by the unique
    /// `(aggregate_type, aggregate_id, version)` constraint.
    #[error(
        "Concurrency conflict for {aggregate_type} {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_type: String,
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The batch handed to `append` violates the append preconditions.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// The payload type is not registered for the aggregate type.
    #[error("Payload type {payload_type} is not registered for aggregate type {aggregate_type}")]
    UnregisteredPayload {
        aggregate_type: String,
        payload_type: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
