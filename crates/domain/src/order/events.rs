//! Order payloads.

use serde::{Deserialize, Serialize};

use crate::change::{ChangeSet, Payload, decode_as};

use super::{DeliveryDetails, PaymentInformation, ProductQuantity};

/// An order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub delivery: DeliveryDetails,
    pub payment_information: PaymentInformation,
    pub products: Vec<ProductQuantity>,
}

impl Payload for OrderCreated {
    const PAYLOAD_TYPE: &'static str = "OrderCreated";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaid {}

impl Payload for OrderPaid {
    const PAYLOAD_TYPE: &'static str = "OrderPaid";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDispatched {}

impl Payload for OrderDispatched {
    const PAYLOAD_TYPE: &'static str = "OrderDispatched";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {}

impl Payload for OrderCompleted {
    const PAYLOAD_TYPE: &'static str = "OrderCompleted";
}

/// Every change an order can fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderChange {
    Created(OrderCreated),
    Paid(OrderPaid),
    Dispatched(OrderDispatched),
    Completed(OrderCompleted),
}

impl From<OrderCreated> for OrderChange {
    fn from(payload: OrderCreated) -> Self {
        OrderChange::Created(payload)
    }
}

impl From<OrderPaid> for OrderChange {
    fn from(payload: OrderPaid) -> Self {
        OrderChange::Paid(payload)
    }
}

impl From<OrderDispatched> for OrderChange {
    fn from(payload: OrderDispatched) -> Self {
        OrderChange::Dispatched(payload)
    }
}

impl From<OrderCompleted> for OrderChange {
    fn from(payload: OrderCompleted) -> Self {
        OrderChange::Completed(payload)
    }
}

impl ChangeSet for OrderChange {
    const PAYLOAD_TYPES: &'static [&'static str] = &[
        OrderCreated::PAYLOAD_TYPE,
        OrderPaid::PAYLOAD_TYPE,
        OrderDispatched::PAYLOAD_TYPE,
        OrderCompleted::PAYLOAD_TYPE,
    ];

    fn payload_type(&self) -> &'static str {
        match self {
            OrderChange::Created(_) => OrderCreated::PAYLOAD_TYPE,
            OrderChange::Paid(_) => OrderPaid::PAYLOAD_TYPE,
            OrderChange::Dispatched(_) => OrderDispatched::PAYLOAD_TYPE,
            OrderChange::Completed(_) => OrderCompleted::PAYLOAD_TYPE,
        }
    }

    fn encode(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            OrderChange::Created(p) => serde_json::to_value(p),
            OrderChange::Paid(p) => serde_json::to_value(p),
            OrderChange::Dispatched(p) => serde_json::to_value(p),
            OrderChange::Completed(p) => serde_json::to_value(p),
        }
    }

    fn decode(payload_type: &str, payload: serde_json::Value) -> Option<serde_json::Result<Self>> {
        let decoded = match payload_type {
            t if t == OrderCreated::PAYLOAD_TYPE => decode_as::<OrderCreated, _>(payload),
            t if t == OrderPaid::PAYLOAD_TYPE => decode_as::<OrderPaid, _>(payload),
            t if t == OrderDispatched::PAYLOAD_TYPE => decode_as::<OrderDispatched, _>(payload),
            t if t == OrderCompleted::PAYLOAD_TYPE => decode_as::<OrderCompleted, _>(payload),
            _ => return None,
        };
        Some(decoded)
    }
}
