//! Order aggregate and related types.

mod aggregate;
mod events;
mod state;
mod value_objects;

pub use aggregate::OrderDetails;
pub use events::{OrderChange, OrderCompleted, OrderCreated, OrderDispatched, OrderPaid};
pub use state::OrderStatus;
pub use value_objects::{DeliveryDetails, PaymentInformation, ProductQuantity};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is not in the expected status.
    #[error("Invalid state transition: cannot {action} from {current_status} status")]
    InvalidStateTransition {
        current_status: OrderStatus,
        action: &'static str,
    },

    #[error("Order has no products")]
    NoProducts,

    #[error("Invalid quantity for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: u32 },
}

#[cfg(test)]
pub(crate) fn sample_order() -> OrderDetails {
    OrderDetails::create(
        common::AggregateId::new(),
        DeliveryDetails::new("1 Main St", "Springfield", "US"),
        PaymentInformation::new("4111111111111111", "12/30", "123"),
        vec![ProductQuantity::new(7, 2), ProductQuantity::new(11, 1)],
    )
    .unwrap()
}
