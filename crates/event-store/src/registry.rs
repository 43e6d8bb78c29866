//! Explicit registry of the payload types a store accepts.

use std::collections::{BTreeSet, HashMap};

use crate::{EventStoreError, Result};

/// Payload type tags accepted per aggregate type.
///
/// Each store instance owns its registry, so stores built side by side (one per
/// test, say) never see each other's registrations.
#[derive(Debug, Clone, Default)]
pub struct PayloadRegistry {
    payload_types: HashMap<String, BTreeSet<String>>,
}

impl PayloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `payload_types` for `aggregate_type`, extending any earlier
    /// registration for the same aggregate type.
    pub fn register<I, T>(mut self, aggregate_type: impl Into<String>, payload_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.payload_types
            .entry(aggregate_type.into())
            .or_default()
            .extend(payload_types.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, aggregate_type: &str, payload_type: &str) -> bool {
        self.payload_types
            .get(aggregate_type)
            .is_some_and(|types| types.contains(payload_type))
    }

    /// Registered payload types for an aggregate type, in sorted order.
    pub fn payload_types(&self, aggregate_type: &str) -> Vec<&str> {
        self.payload_types
            .get(aggregate_type)
            .map(|types| types.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn ensure_registered(&self, aggregate_type: &str, payload_type: &str) -> Result<()> {
        if self.contains(aggregate_type, payload_type) {
            Ok(())
        } else {
            Err(EventStoreError::UnregisteredPayload {
                aggregate_type: aggregate_type.to_string(),
                payload_type: payload_type.to_string(),
            })
        }
    }
}
