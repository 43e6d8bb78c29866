use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventStoreError, PayloadRegistry, Result, StoredChange, Version,
    store::{EventStore, check_expected_version, validate_changes_for_append},
};

type StreamKey = (String, AggregateId);

/// Change streams plus the uniqueness index standing in for the durable
/// `(aggregate_type, aggregate_id, version)` constraint.
#[derive(Default)]
struct Streams {
    streams: HashMap<StreamKey, Vec<StoredChange>>,
    unique: HashSet<(String, AggregateId, Version)>,
}

impl Streams {
    fn latest_version(&self, aggregate_type: &str, aggregate_id: AggregateId) -> Option<Version> {
        self.streams
            .get(&(aggregate_type.to_string(), aggregate_id))
            .and_then(|stream| stream.last())
            .map(|change| change.version)
    }

    /// Inserts the batch all-or-nothing, enforcing the uniqueness index.
    fn insert_batch(
        &mut self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        changes: Vec<StoredChange>,
        expected_version: Version,
    ) -> Result<Version> {
        if let Some(taken) = changes.iter().find(|change| {
            self.unique
                .contains(&(aggregate_type.to_string(), aggregate_id, change.version))
        }) {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_type: aggregate_type.to_string(),
                aggregate_id,
                expected: Version::new(taken.version.as_i64() - 1),
                actual: self
                    .latest_version(aggregate_type, aggregate_id)
                    .unwrap_or(taken.version),
            });
        }

        for change in &changes {
            self.unique
                .insert((aggregate_type.to_string(), aggregate_id, change.version));
        }
        self.streams
            .entry((aggregate_type.to_string(), aggregate_id))
            .or_default()
            .extend(changes);

        Ok(expected_version)
    }
}

/// In-memory store for tests and local development.
///
/// Clones share the same streams. The version check and the insert happen
/// under one write lock with no suspension point in between, so dropping an
/// `append` future never leaves a partial batch behind.
#[derive(Clone)]
pub struct InMemoryEventStore {
    registry: Arc<PayloadRegistry>,
    streams: Arc<RwLock<Streams>>,
}

impl InMemoryEventStore {
    pub fn new(registry: PayloadRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            streams: Arc::new(RwLock::new(Streams::default())),
        }
    }

    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }

    /// Total number of changes across all streams.
    pub async fn change_count(&self) -> usize {
        self.streams
            .read()
            .await
            .streams
            .values()
            .map(Vec::len)
            .sum()
    }

    pub async fn clear(&self) {
        let mut streams = self.streams.write().await;
        streams.streams.clear();
        streams.unique.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip(self, changes), fields(batch = changes.len()))]
    async fn append(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        changes: Vec<StoredChange>,
        expected_version: Version,
    ) -> Result<Version> {
        if changes.is_empty() {
            return Ok(expected_version);
        }
        validate_changes_for_append(
            &self.registry,
            aggregate_type,
            aggregate_id,
            &changes,
            expected_version,
        )?;

        let mut streams = self.streams.write().await;

        let current = streams.latest_version(aggregate_type, aggregate_id);
        check_expected_version(
            aggregate_type,
            aggregate_id,
            current,
            changes.len(),
            expected_version,
        )?;

        let version = streams.insert_batch(aggregate_type, aggregate_id, changes, expected_version)?;
        metrics::counter!("event_store_appends_total", "backend" => "memory").increment(1);
        tracing::debug!(%version, "appended changes");
        Ok(version)
    }

    async fn fetch(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredChange>> {
        let streams = self.streams.read().await;
        Ok(streams
            .streams
            .get(&(aggregate_type.to_string(), aggregate_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn latest_version(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<Version>> {
        Ok(self
            .streams
            .read()
            .await
            .latest_version(aggregate_type, aggregate_id))
    }
}
