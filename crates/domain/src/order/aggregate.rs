//! Order aggregate implementation.

use common::AggregateId;

use crate::aggregate::{Aggregate, AggregateCore, Apply};

use super::{
    DeliveryDetails, OrderChange, OrderCompleted, OrderCreated, OrderDispatched, OrderError,
    OrderPaid, OrderStatus, PaymentInformation, ProductQuantity,
};

/// Order aggregate root.
///
/// Tracks an order from placement through payment and dispatch to delivery.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    core: AggregateCore<OrderChange>,
    delivery: Option<DeliveryDetails>,
    payment_information: Option<PaymentInformation>,
    products: Vec<ProductQuantity>,
    status: OrderStatus,
}

impl Aggregate for OrderDetails {
    const AGGREGATE_TYPE: &'static str = "OrderDetails";
    type Change = OrderChange;

    fn from_core(core: AggregateCore<OrderChange>) -> Self {
        Self {
            core,
            delivery: None,
            payment_information: None,
            products: Vec::new(),
            status: OrderStatus::default(),
        }
    }

    fn core(&self) -> &AggregateCore<OrderChange> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AggregateCore<OrderChange> {
        &mut self.core
    }

    fn apply_change(&mut self, change: &OrderChange) {
        match change {
            OrderChange::Created(p) => <Self as Apply<OrderCreated>>::apply(self, p),
            OrderChange::Paid(p) => <Self as Apply<OrderPaid>>::apply(self, p),
            OrderChange::Dispatched(p) => <Self as Apply<OrderDispatched>>::apply(self, p),
            OrderChange::Completed(p) => <Self as Apply<OrderCompleted>>::apply(self, p),
        }
    }
}

impl Apply<OrderCreated> for OrderDetails {
    fn apply(&mut self, payload: &OrderCreated) {
        self.delivery = Some(payload.delivery.clone());
        self.payment_information = Some(payload.payment_information.clone());
        self.products = payload.products.clone();
        self.status = OrderStatus::Created;
    }
}

impl Apply<OrderPaid> for OrderDetails {
    fn apply(&mut self, _payload: &OrderPaid) {
        self.status = OrderStatus::Paid;
    }
}

impl Apply<OrderDispatched> for OrderDetails {
    fn apply(&mut self, _payload: &OrderDispatched) {
        self.status = OrderStatus::Dispatched;
    }
}

impl Apply<OrderCompleted> for OrderDetails {
    fn apply(&mut self, _payload: &OrderCompleted) {
        self.status = OrderStatus::Completed;
    }
}

// Query methods
impl OrderDetails {
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn delivery(&self) -> Option<&DeliveryDetails> {
        self.delivery.as_ref()
    }

    pub fn payment_information(&self) -> Option<&PaymentInformation> {
        self.payment_information.as_ref()
    }

    pub fn products(&self) -> &[ProductQuantity] {
        &self.products
    }

    /// Total number of units across all product lines.
    pub fn total_quantity(&self) -> u32 {
        self.products.iter().map(|p| p.quantity).sum()
    }
}

// Command methods
impl OrderDetails {
    /// Places a new order.
    ///
    /// The returned aggregate holds one pending `OrderCreated` change at
    /// version 1.
    pub fn create(
        id: AggregateId,
        delivery: DeliveryDetails,
        payment_information: PaymentInformation,
        products: Vec<ProductQuantity>,
    ) -> Result<Self, OrderError> {
        if products.is_empty() {
            return Err(OrderError::NoProducts);
        }
        if let Some(line) = products.iter().find(|p| p.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
            });
        }

        let mut order = Self::from_core(AggregateCore::new(id));
        order.fold(OrderCreated {
            delivery,
            payment_information,
            products,
        });
        Ok(order)
    }

    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        if !self.status.can_pay() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "pay",
            });
        }

        self.fold(OrderPaid {});
        Ok(())
    }

    pub fn mark_dispatched(&mut self) -> Result<(), OrderError> {
        if !self.status.can_dispatch() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "dispatch",
            });
        }

        self.fold(OrderDispatched {});
        Ok(())
    }

    /// Records delivery to the customer.
    pub fn mark_completed(&mut self) -> Result<(), OrderError> {
        if !self.status.can_complete() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "complete",
            });
        }

        self.fold(OrderCompleted {});
        Ok(())
    }
}
