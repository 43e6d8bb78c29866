//! Change records and the payload capability table.

use common::AggregateId;
use event_store::{StoredChange, TransactionId, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DomainError;

/// A single kind of state transition, e.g. `OrderPaid`.
///
/// `PAYLOAD_TYPE` is persisted next to every record and must stay stable
/// across releases; renaming it orphans stored history.
pub trait Payload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const PAYLOAD_TYPE: &'static str;
}

/// The closed set of payloads an aggregate understands.
///
/// Usually an enum with one variant per [`Payload`]. It maps between the typed
/// payload and its stored `(payload_type, json)` form; the aggregate routes
/// each variant to its matching [`Apply`](crate::Apply) handler.
pub trait ChangeSet: Clone + Send + Sync + Sized + 'static {
    /// Every payload type tag in the set.
    const PAYLOAD_TYPES: &'static [&'static str];

    fn payload_type(&self) -> &'static str;

    fn encode(&self) -> serde_json::Result<serde_json::Value>;

    /// Decodes a stored payload, or returns `None` when `payload_type` is not
    /// part of this set.
    fn decode(payload_type: &str, payload: serde_json::Value)
    -> Option<serde_json::Result<Self>>;
}

/// Decodes `payload` as `P` and wraps it into the change set `C`.
pub fn decode_as<P, C>(payload: serde_json::Value) -> serde_json::Result<C>
where
    P: Payload,
    C: From<P>,
{
    serde_json::from_value::<P>(payload).map(C::from)
}

/// One immutable state transition of an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord<C> {
    payload: C,
    aggregate_id: AggregateId,
    payload_type: &'static str,
    transaction_id: TransactionId,
    version: Version,
    is_new: bool,
}

impl<C: ChangeSet> ChangeRecord<C> {
    pub(crate) fn new(payload: C, aggregate_id: AggregateId, version: Version, is_new: bool) -> Self {
        Self {
            payload_type: payload.payload_type(),
            transaction_id: TransactionId::new(aggregate_id, version),
            payload,
            aggregate_id,
            version,
            is_new,
        }
    }

    /// Rebuilds a historical record from its persisted shape.
    ///
    /// Fails with `InvalidArgument` when the stored payload is absent and with
    /// `TypeMismatch` when `C` has no variant for the stored payload type.
    pub fn from_stored(stored: StoredChange) -> Result<Self, DomainError> {
        let StoredChange {
            aggregate_type,
            aggregate_id,
            version,
            payload_type,
            transaction_id,
            payload,
            ..
        } = stored;

        if payload.is_null() {
            return Err(DomainError::InvalidArgument(format!(
                "change {transaction_id} has no payload"
            )));
        }

        let payload = C::decode(&payload_type, payload).ok_or_else(|| {
            DomainError::TypeMismatch {
                aggregate_type,
                payload_type,
            }
        })??;

        Ok(Self {
            payload_type: payload.payload_type(),
            payload,
            aggregate_id,
            transaction_id,
            version,
            is_new: false,
        })
    }

    /// Converts into the persisted shape for `aggregate_type`.
    pub fn to_stored(&self, aggregate_type: &str) -> Result<StoredChange, DomainError> {
        Ok(StoredChange::new(
            aggregate_type,
            self.aggregate_id,
            self.version,
            self.payload_type,
            self.payload.encode()?,
        ))
    }
}

impl<C> ChangeRecord<C> {
    pub fn payload(&self) -> &C {
        &self.payload
    }

    pub fn into_payload(self) -> C {
        self.payload
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn payload_type(&self) -> &'static str {
        self.payload_type
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// True when the record was produced in this session rather than replayed.
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}
