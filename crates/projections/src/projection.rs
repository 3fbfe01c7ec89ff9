//! The projection trait and the per-order checkpoint views use to stay
//! idempotent.

use std::collections::HashMap;

use async_trait::async_trait;
use common::AggregateId;
use event_store::{EventEnvelope, Version};

use crate::Result;

/// Highest event version a view has applied, per aggregate.
///
/// The log's global order is not its commit order, so a position in
/// [`EventStore::stream_all_events`](event_store::EventStore::stream_all_events)
/// says nothing about what was applied. Versions within one aggregate are
/// gap-free and become visible in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    applied: HashMap<AggregateId, Version>,
    events_applied: u64,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `event` is at or below the version already applied for its
    /// aggregate.
    pub fn has_applied(&self, event: &EventEnvelope) -> bool {
        self.applied
            .get(&event.aggregate_id)
            .is_some_and(|applied| event.version <= *applied)
    }

    /// Records `event` as applied.
    pub fn record(&mut self, event: &EventEnvelope) {
        self.applied.insert(event.aggregate_id, event.version);
        self.events_applied += 1;
    }

    pub fn applied_version(&self, aggregate_id: AggregateId) -> Option<Version> {
        self.applied.get(&aggregate_id).copied()
    }

    /// Total events applied since the last reset.
    pub fn events_applied(&self) -> u64 {
        self.events_applied
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} events across {} aggregates",
            self.events_applied,
            self.applied.len()
        )
    }
}

/// Turns store events into a read model.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Applies `event` unless the view already holds it.
    ///
    /// Returns `false` when the event was skipped as already applied.
    async fn handle(&self, event: &EventEnvelope) -> Result<bool>;

    async fn checkpoint(&self) -> Checkpoint;

    /// Drops every row and the checkpoint.
    async fn reset(&self) -> Result<()>;
}
