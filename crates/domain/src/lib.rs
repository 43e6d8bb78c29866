//! Aggregate layer for the event-sourcing system.
//!
//! This crate provides:
//! - The [`Aggregate`] trait with its [`Apply`] capability table
//! - Change records and payload encoding
//! - [`AggregateRepository`] for loading and saving aggregates
//! - An order aggregate built on top of them

pub mod aggregate;
pub mod change;
pub mod error;
pub mod order;
pub mod repository;

pub use aggregate::{Aggregate, AggregateCore, Apply};
pub use change::{ChangeRecord, ChangeSet, Payload, decode_as};
pub use error::DomainError;
pub use order::{
    DeliveryDetails, OrderChange, OrderCompleted, OrderCreated, OrderDetails, OrderDispatched,
    OrderError, OrderPaid, OrderStatus, PaymentInformation, ProductQuantity,
};
pub use repository::{AggregateRepository, PayloadRegistryExt};
