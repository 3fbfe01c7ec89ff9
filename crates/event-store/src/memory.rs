use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, StockChange, StockDirection, Version,
    stock::Inventory,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

#[derive(Default)]
struct StoreState {
    events: Vec<EventEnvelope>,
    stock: HashMap<String, u32>,
}

impl StoreState {
    fn current_version(&self, aggregate_id: AggregateId) -> Version {
        self.events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial())
    }

    /// Computes the stock levels after `changes` without touching live state.
    fn stage_stock_changes(&self, changes: &[StockChange]) -> Result<HashMap<String, u32>> {
        let mut staged: HashMap<String, u32> = HashMap::new();
        for change in changes {
            let available = match staged.get(&change.product_id) {
                Some(level) => *level,
                None => *self
                    .stock
                    .get(&change.product_id)
                    .ok_or_else(|| EventStoreError::UnknownProduct(change.product_id.clone()))?,
            };
            let level = change.apply_to(available).ok_or_else(|| match change.direction {
                StockDirection::Decrement => EventStoreError::InsufficientStock {
                    product_id: change.product_id.clone(),
                    requested: change.quantity,
                    available,
                },
                StockDirection::Increment => EventStoreError::StockOutOfRange {
                    product_id: change.product_id.clone(),
                    level: i64::from(available) + i64::from(change.quantity),
                },
            })?;
            staged.insert(change.product_id.clone(), level);
        }
        Ok(staged)
    }
}

/// In-memory event store.
///
/// Events and stock levels sit behind a single lock, so an append and its
/// stock changes are applied together or not at all.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let mut state = self.state.write().await;

        let current_version = state.current_version(aggregate_id);
        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        if events[0].version <= current_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let staged = state.stage_stock_changes(&options.stock_changes)?;

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial());
        state.stock.extend(staged);
        state.events.extend(events);

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let state = self.state.read().await;
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.state.read().await.events.clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max())
    }
}

#[async_trait]
impl Inventory for InMemoryEventStore {
    async fn stock_level(&self, product_id: &str) -> Result<Option<u32>> {
        Ok(self.state.read().await.stock.get(product_id).copied())
    }

    async fn set_stock(&self, product_id: &str, available: u32) -> Result<()> {
        self.state
            .write()
            .await
            .stock
            .insert(product_id.to_string(), available);
        Ok(())
    }

    async fn decrement_if_available(&self, product_id: &str, quantity: u32) -> Result<u32> {
        let mut state = self.state.write().await;
        let staged = state.stage_stock_changes(&[StockChange::decrement(product_id, quantity)])?;
        let level = staged.get(product_id).copied().unwrap_or_default();
        state.stock.extend(staged);
        Ok(level)
    }

    async fn increment(&self, product_id: &str, quantity: u32) -> Result<u32> {
        let mut state = self.state.write().await;
        let staged = state.stage_stock_changes(&[StockChange::increment(product_id, quantity)])?;
        let level = staged.get(product_id).copied().unwrap_or_default();
        state.stock.extend(staged);
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_event(aggregate_id: AggregateId, version: i64, event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Order")
            .event_type(event_type)
            .version(Version::new(version))
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let version = store
            .append(
                vec![order_event(id, 1, "OrderPlaced"), order_event(id, 2, "OrderPaid")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        assert_eq!(version, Version::new(2));
        let events = store.get_events_for_aggregate(id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, "OrderPaid");
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![order_event(id, 1, "OrderPlaced")], AppendOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .append(
                vec![order_event(id, 2, "OrderPaid")],
                AppendOptions::expect_version(Version::initial()),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn append_with_stock_changes_commits_both() {
        let store = InMemoryEventStore::new();
        store.set_stock("SKU-1", 5).await.unwrap();
        let id = AggregateId::new();

        store
            .append(
                vec![order_event(id, 1, "OrderPlaced")],
                AppendOptions::expect_new()
                    .with_stock_changes(vec![StockChange::decrement("SKU-1", 2)]),
            )
            .await
            .unwrap();

        assert_eq!(store.stock_level("SKU-1").await.unwrap(), Some(3));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn failed_stock_change_writes_nothing() {
        let store = InMemoryEventStore::new();
        store.set_stock("SKU-1", 5).await.unwrap();
        store.set_stock("SKU-2", 1).await.unwrap();
        let id = AggregateId::new();

        let result = store
            .append(
                vec![order_event(id, 1, "OrderPlaced")],
                AppendOptions::expect_new().with_stock_changes(vec![
                    StockChange::decrement("SKU-1", 2),
                    StockChange::decrement("SKU-2", 2),
                ]),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::InsufficientStock { ref product_id, requested: 2, available: 1 })
                if product_id == "SKU-2"
        ));
        assert_eq!(store.stock_level("SKU-1").await.unwrap(), Some(5));
        assert_eq!(store.stock_level("SKU-2").await.unwrap(), Some(1));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn repeated_product_is_checked_against_running_total() {
        let store = InMemoryEventStore::new();
        store.set_stock("SKU-1", 3).await.unwrap();
        let id = AggregateId::new();

        let result = store
            .append(
                vec![order_event(id, 1, "OrderPlaced")],
                AppendOptions::expect_new().with_stock_changes(vec![
                    StockChange::decrement("SKU-1", 2),
                    StockChange::decrement("SKU-1", 2),
                ]),
            )
            .await;

        assert!(matches!(result, Err(EventStoreError::InsufficientStock { available: 1, .. })));
        assert_eq!(store.stock_level("SKU-1").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let store = InMemoryEventStore::new();
        let result = store.decrement_if_available("SKU-404", 1).await;
        assert!(matches!(result, Err(EventStoreError::UnknownProduct(_))));
    }

    #[tokio::test]
    async fn concurrent_decrements_never_oversell() {
        let store = InMemoryEventStore::new();
        store.set_stock("SKU-1", 1).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.decrement_if_available("SKU-1", 1).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.stock_level("SKU-1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn stream_all_events_in_insertion_order() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();
        store
            .append(vec![order_event(a, 1, "OrderPlaced")], AppendOptions::new())
            .await
            .unwrap();
        store
            .append(vec![order_event(b, 1, "OrderPlaced")], AppendOptions::new())
            .await
            .unwrap();

        let events: Vec<_> = store.stream_all_events().await.unwrap().collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().aggregate_id, a);
    }

    #[tokio::test]
    async fn increment_past_u32_is_out_of_range() {
        let store = InMemoryEventStore::new();
        store.set_stock("SKU-1", u32::MAX).await.unwrap();

        let result = store.increment("SKU-1", 1).await;

        assert!(matches!(result, Err(EventStoreError::StockOutOfRange { .. })));
        assert_eq!(store.stock_level("SKU-1").await.unwrap(), Some(u32::MAX));
    }
}
