use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AggregateId;

/// Position of a change within an aggregate's stream.
///
/// A fresh aggregate sits at version 0; the first persisted change carries
/// version 1 and every following change increments by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of an aggregate that has no changes yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version carried by the first change of a stream.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Natural external identifier of a change, `"{aggregate_id}:{version}"`.
///
/// Derived, never generated, so retrying the same change yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(aggregate_id: AggregateId, version: Version) -> Self {
        Self(format!("{aggregate_id}:{version}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A change record in the shape the backends persist it.
///
/// `(aggregate_type, aggregate_id, version)` is unique across a store; the
/// payload is kept as structured JSON and interpreted by domain code through
/// `payload_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChange {
    /// Declared type of the owning aggregate (e.g. "OrderDetails").
    pub aggregate_type: String,

    pub aggregate_id: AggregateId,

    /// Version of the aggregate after this change.
    pub version: Version,

    /// Stable tag of the payload (e.g. "OrderPaid").
    pub payload_type: String,

    pub transaction_id: TransactionId,

    pub created_at: DateTime<Utc>,

    pub payload: serde_json::Value,
}

impl StoredChange {
    /// Creates a record stamped with the current time.
    ///
    /// The transaction id is derived from the aggregate id and version.
    pub fn new(
        aggregate_type: impl Into<String>,
        aggregate_id: AggregateId,
        version: Version,
        payload_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_type: aggregate_type.into(),
            aggregate_id,
            version,
            payload_type: payload_type.into(),
            transaction_id: TransactionId::new(aggregate_id, version),
            created_at: Utc::now(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering_and_successor() {
        assert!(Version::new(1) < Version::new(2));
        assert_eq!(Version::initial().next(), Version::first());
        assert_eq!(Version::first().next().as_i64(), 2);
    }

    #[test]
    fn transaction_id_joins_id_and_version() {
        let id = AggregateId::new();
        let tx = TransactionId::new(id, Version::new(7));
        assert_eq!(tx.as_str(), format!("{id}:7"));
    }

    #[test]
    fn stored_change_derives_transaction_id() {
        let id = AggregateId::new();
        let change = StoredChange::new(
            "OrderDetails",
            id,
            Version::new(3),
            "OrderPaid",
            serde_json::json!({}),
        );

        assert_eq!(change.transaction_id, TransactionId::new(id, Version::new(3)));
        assert_eq!(change.aggregate_type, "OrderDetails");
        assert_eq!(change.payload_type, "OrderPaid");
    }
}
