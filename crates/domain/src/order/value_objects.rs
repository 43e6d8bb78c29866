//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub street: String,
    pub city: String,
    pub country: String,
}

impl DeliveryDetails {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            country: country.into(),
        }
    }
}

/// Card used to pay for an order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInformation {
    pub card_number: String,
    pub expire_date: String,
    pub security_code: String,
}

impl PaymentInformation {
    pub fn new(
        card_number: impl Into<String>,
        expire_date: impl Into<String>,
        security_code: impl Into<String>,
    ) -> Self {
        Self {
            card_number: card_number.into(),
            expire_date: expire_date.into(),
            security_code: security_code.into(),
        }
    }

    /// Last four digits of the card number.
    pub fn last_four(&self) -> &str {
        let len = self.card_number.len();
        self.card_number.get(len.saturating_sub(4)..).unwrap_or_default()
    }
}

// Keeps card data out of logs.
impl std::fmt::Debug for PaymentInformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentInformation")
            .field("card_number", &format_args!("****{}", self.last_four()))
            .finish_non_exhaustive()
    }
}

/// A product line on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductQuantity {
    pub product_id: u32,
    pub quantity: u32,
}

impl ProductQuantity {
    pub fn new(product_id: u32, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}
