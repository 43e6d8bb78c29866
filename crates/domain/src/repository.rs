//! Loading and saving aggregates through an event store.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{EventStore, PayloadRegistry};

use crate::aggregate::{Aggregate, AggregateCore, load_from_history, mark_committed};
use crate::change::{ChangeRecord, ChangeSet};
use crate::error::DomainError;

/// Registers an aggregate's payload types with a store registry.
pub trait PayloadRegistryExt {
    fn register_aggregate<A: Aggregate>(self) -> Self;
}

impl PayloadRegistryExt for PayloadRegistry {
    fn register_aggregate<A: Aggregate>(self) -> Self {
        self.register(
            A::AGGREGATE_TYPE,
            <A::Change as ChangeSet>::PAYLOAD_TYPES.iter().copied(),
        )
    }
}

/// Loads aggregates by replaying their stream and saves their pending changes.
///
/// Holds no per-aggregate state, so one repository can serve concurrent loads
/// and saves. Saving the same aggregate instance from two tasks at once is not
/// supported.
pub struct AggregateRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<fn() -> A>,
}

impl<S, A> AggregateRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds an aggregate from its full history.
    ///
    /// Returns `None` when the stream has no changes. Fails with
    /// `TypeMismatch` when the history holds a payload the aggregate has no
    /// handler for.
    #[tracing::instrument(skip(self), fields(aggregate_type = A::AGGREGATE_TYPE))]
    pub async fn get_by_id(&self, id: AggregateId) -> Result<Option<A>, DomainError> {
        let stored = self.store.fetch(A::AGGREGATE_TYPE, id).await?;
        if stored.is_empty() {
            tracing::debug!("no history found");
            return Ok(None);
        }

        let history = stored
            .into_iter()
            .map(ChangeRecord::from_stored)
            .collect::<Result<Vec<_>, _>>()?;

        metrics::counter!("aggregate_loads_total", "aggregate_type" => A::AGGREGATE_TYPE)
            .increment(1);
        metrics::histogram!("aggregate_replay_length", "aggregate_type" => A::AGGREGATE_TYPE)
            .record(history.len() as f64);

        let mut aggregate = A::from_core(AggregateCore::new(id));
        load_from_history(&mut aggregate, history);

        tracing::debug!(version = %aggregate.version(), "aggregate loaded");
        Ok(Some(aggregate))
    }

    /// Appends the aggregate's pending changes in one batch.
    ///
    /// Nothing pending means no store call. On success the pending list is
    /// cleared; on any failure, including a dropped future, it is kept so the
    /// caller can reload and retry.
    #[tracing::instrument(
        skip(self, aggregate),
        fields(aggregate_type = A::AGGREGATE_TYPE, aggregate_id = %aggregate.id())
    )]
    pub async fn save(&self, aggregate: &mut A) -> Result<(), DomainError> {
        let pending = aggregate.uncommitted_changes();
        if pending.is_empty() {
            return Ok(());
        }

        let changes = pending
            .iter()
            .map(|record| record.to_stored(A::AGGREGATE_TYPE))
            .collect::<Result<Vec<_>, _>>()?;
        let count = changes.len();

        match self
            .store
            .append(A::AGGREGATE_TYPE, aggregate.id(), changes, aggregate.version())
            .await
        {
            Ok(version) => {
                mark_committed(aggregate);
                metrics::counter!("aggregate_saves_total", "aggregate_type" => A::AGGREGATE_TYPE)
                    .increment(1);
                metrics::counter!(
                    "aggregate_changes_persisted_total",
                    "aggregate_type" => A::AGGREGATE_TYPE
                )
                .increment(count as u64);
                tracing::debug!(%version, count, "changes saved");
                Ok(())
            }
            Err(err) if err.is_concurrency_conflict() => {
                metrics::counter!(
                    "aggregate_concurrency_conflicts_total",
                    "aggregate_type" => A::AGGREGATE_TYPE
                )
                .increment(1);
                tracing::warn!(error = %err, "concurrency conflict on save");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}
