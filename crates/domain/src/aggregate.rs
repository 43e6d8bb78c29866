//! Core aggregate traits.

use common::AggregateId;
use event_store::Version;

use crate::change::{ChangeRecord, ChangeSet};

/// Fold handler for one payload type.
///
/// An aggregate implements `Apply<P>` once per payload it understands; the set
/// of impls is its capability table. Handlers must be deterministic and must
/// not fail, since they also run when replaying history.
pub trait Apply<P> {
    fn apply(&mut self, payload: &P);
}

/// Identity, version and pending-change bookkeeping shared by all aggregates.
///
/// Only this crate can move the version or touch the pending list; aggregates
/// expose their core read-only to callers outside it.
#[derive(Debug, Clone)]
pub struct AggregateCore<C> {
    id: AggregateId,
    version: Version,
    pending: Vec<ChangeRecord<C>>,
    replaying: bool,
}

impl<C: ChangeSet> AggregateCore<C> {
    /// Bookkeeping for an aggregate with no history, at version 0.
    pub fn new(id: AggregateId) -> Self {
        Self {
            id,
            version: Version::initial(),
            pending: Vec::new(),
            replaying: false,
        }
    }

    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn pending(&self) -> &[ChangeRecord<C>] {
        &self.pending
    }

    fn record(&mut self, change: C) {
        self.version = self.version.next();
        let record = ChangeRecord::new(change, self.id, self.version, !self.replaying);
        if record.is_new() {
            self.pending.push(record);
        }
    }
}

/// An event-sourced entity whose state is the left fold of its changes.
///
/// Aggregates are built in two phases. [`Aggregate::from_core`] produces an
/// empty shell, which is either replayed from history by the repository or
/// given its first change by a domain constructor calling [`Aggregate::fold`].
pub trait Aggregate: Send + Sync + Sized {
    /// Stable type name the aggregate's streams are stored under.
    const AGGREGATE_TYPE: &'static str;

    /// Every payload this aggregate can fold.
    type Change: ChangeSet;

    /// Builds a valid but empty shell around `core`.
    fn from_core(core: AggregateCore<Self::Change>) -> Self;

    fn core(&self) -> &AggregateCore<Self::Change>;

    fn core_mut(&mut self) -> &mut AggregateCore<Self::Change>;

    /// Routes a change to its [`Apply`] handler.
    fn apply_change(&mut self, change: &Self::Change);

    fn id(&self) -> AggregateId {
        self.core().id()
    }

    /// Number of changes folded so far, replayed or new.
    fn version(&self) -> Version {
        self.core().version()
    }

    /// Changes produced since the last successful save, oldest first.
    fn uncommitted_changes(&self) -> &[ChangeRecord<Self::Change>] {
        self.core().pending()
    }

    /// Applies a state transition and records it.
    ///
    /// The handler runs before any bookkeeping, then the version advances by
    /// one. Outside replay the record joins the pending list.
    fn fold<P>(&mut self, payload: P)
    where
        P: Into<Self::Change>,
    {
        let change = payload.into();
        self.apply_change(&change);
        self.core_mut().record(change);
    }
}

/// Replays persisted history into a fresh shell.
///
/// An empty history leaves the aggregate untouched. Otherwise the version ends
/// at the last record's version and nothing is left pending.
///
/// The records built while replaying are discarded, not kept on the
/// aggregate. Only state and the final version survive; the store stays the
/// single owner of history.
pub(crate) fn load_from_history<A: Aggregate>(
    aggregate: &mut A,
    history: Vec<ChangeRecord<A::Change>>,
) {
    let Some(last) = history.last().map(ChangeRecord::version) else {
        return;
    };

    aggregate.core_mut().replaying = true;
    for record in history {
        aggregate.fold(record.into_payload());
    }

    let core = aggregate.core_mut();
    core.replaying = false;
    core.version = last;
}

/// Clears the pending list after its changes were durably appended.
pub(crate) fn mark_committed<A: Aggregate>(aggregate: &mut A) {
    aggregate.core_mut().pending.clear();
}
