//! Order status machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// ```text
/// Uninitialized ──► Created ──► Paid ──► Dispatched ──► Completed
/// ```
///
/// `Uninitialized` belongs to an empty shell that has not seen `OrderCreated`
/// yet; only replay or `OrderDetails::create` moves it on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Uninitialized,
    Created,
    Paid,
    Dispatched,
    /// Delivered to the customer (terminal).
    Completed,
}

impl OrderStatus {
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    pub fn can_dispatch(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Dispatched)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Uninitialized => "Uninitialized",
            OrderStatus::Created => "Created",
            OrderStatus::Paid => "Paid",
            OrderStatus::Dispatched => "Dispatched",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
