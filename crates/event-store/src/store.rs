use async_trait::async_trait;

use crate::{AggregateId, EventStoreError, PayloadRegistry, Result, StoredChange, Version};

/// Durable append-only log of changes, partitioned by aggregate type and id.
///
/// Implementations must be safe to share between concurrent load and save
/// calls, for the same or different aggregates.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of changes to one aggregate's stream.
    ///
    /// `expected_version` is the aggregate's version after the batch, so the
    /// batch must carry versions `expected_version - len + 1 ..= expected_version`.
    /// Fails with `ConcurrencyConflict` when the stream has moved past
    /// `expected_version - len`, whether that is caught by the version
    /// pre-check or by the unique `(aggregate_type, aggregate_id, version)`
    /// constraint, and with `InvalidAppend` when the batch would leave a gap.
    /// The batch is written atomically and in order.
    ///
    /// An empty batch is a no-op returning `expected_version`. Otherwise
    /// returns the new stream version.
    async fn append(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        changes: Vec<StoredChange>,
        expected_version: Version,
    ) -> Result<Version>;

    /// Returns every change of the stream in ascending version order.
    ///
    /// A stream without history yields an empty vector.
    async fn fetch(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredChange>>;

    /// Highest persisted version of the stream, if any.
    async fn latest_version(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<Version>>;
}

/// Convenience methods available on every store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn aggregate_exists(&self, aggregate_type: &str, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self
            .latest_version(aggregate_type, aggregate_id)
            .await?
            .is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks a non-empty batch against the append preconditions.
pub fn validate_changes_for_append(
    registry: &PayloadRegistry,
    aggregate_type: &str,
    aggregate_id: AggregateId,
    changes: &[StoredChange],
    expected_version: Version,
) -> Result<()> {
    let base = Version::new(expected_version.as_i64() - changes.len() as i64);
    if base.as_i64() < 0 {
        return Err(EventStoreError::InvalidAppend(format!(
            "expected version {expected_version} cannot hold {} changes",
            changes.len()
        )));
    }

    let mut version = base;
    for change in changes {
        version = version.next();

        if change.aggregate_type != aggregate_type || change.aggregate_id != aggregate_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "change {} does not belong to {aggregate_type} {aggregate_id}",
                change.transaction_id
            )));
        }
        if change.version != version {
            return Err(EventStoreError::InvalidAppend(format!(
                "change versions must be sequential: expected {version}, got {}",
                change.version
            )));
        }
        registry.ensure_registered(aggregate_type, &change.payload_type)?;
    }

    Ok(())
}

/// Version-check fast path shared by the backends.
///
/// The stream must sit exactly at the version the writer started from.
/// A stream past that point means another writer got there first and is a
/// `ConcurrencyConflict`. A stream short of it would leave a gap, which is an
/// `InvalidAppend`.
pub fn check_expected_version(
    aggregate_type: &str,
    aggregate_id: AggregateId,
    current: Option<Version>,
    batch_len: usize,
    expected_version: Version,
) -> Result<()> {
    let base = Version::new(expected_version.as_i64() - batch_len as i64);
    let actual = current.unwrap_or(Version::initial());

    if actual < base {
        return Err(EventStoreError::InvalidAppend(format!(
            "{aggregate_type} {aggregate_id} is at version {actual}, batch would start after {base}"
        )));
    }
    if actual > base {
        return Err(EventStoreError::ConcurrencyConflict {
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            expected: base,
            actual,
        });
    }
    Ok(())
}
