//! Store backend for event-sourced aggregates.
//!
//! Defines the append/fetch contract with its optimistic concurrency
//! guarantee, the persisted change shape, the payload registry each backend is
//! built with, and two backends: in-memory and PostgreSQL.

pub mod change;
pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod registry;
pub mod store;

pub use change::{StoredChange, TransactionId, Version};
pub use common::AggregateId;
pub use config::PostgresConfig;
pub use error::{EventStoreError, Result};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use registry::PayloadRegistry;
pub use store::{EventStore, EventStoreExt};
