use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, StockChange, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected current version of the aggregate. `None` skips the check.
    pub expected_version: Option<Version>,

    /// Stock adjustments committed in the same unit of work as the events.
    ///
    /// If any decrement cannot be satisfied, nothing is written: no events,
    /// no stock changes.
    pub stock_changes: Vec<StockChange>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the aggregate to be at `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
            ..Self::default()
        }
    }

    /// Expects the aggregate to have no events yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }

    /// Attaches stock adjustments to the append.
    pub fn with_stock_changes(mut self, changes: Vec<StockChange>) -> Self {
        self.stock_changes = changes;
        self
    }
}

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Core trait for event store implementations.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events (and any attached stock changes) atomically.
    ///
    /// Fails with `ConcurrencyConflict` if `options.expected_version` does not
    /// match, and with `InsufficientStock` / `UnknownProduct` if a stock
    /// change cannot be applied. Returns the aggregate's new version.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// Retrieves all events for an aggregate in version order.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Streams every event in the store in insertion order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Returns the current version of an aggregate, or `None` if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;
}

/// Checks that a batch targets one aggregate with consecutive versions.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty event list".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for event in events.iter().skip(1) {
        if event.aggregate_id != first.aggregate_id || event.aggregate_type != first.aggregate_type
        {
            return Err(EventStoreError::InvalidAppend(
                "all events must belong to the same aggregate".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential: expected {expected_version}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}
