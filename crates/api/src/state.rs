//! Shared application state.

use std::sync::Arc;

use domain::{InMemoryCatalog, OrderPolicy, OrderService};
use event_store::{EventStore, Inventory};
use projections::{OrderListView, ProjectionProcessor, ReturnQueueView};
use tokio::sync::Mutex;

use crate::error::ApiError;

/// Storage backend the server can run on: events plus stock levels.
pub trait Backend: EventStore + Inventory + Clone + 'static {}

impl<T: EventStore + Inventory + Clone + 'static> Backend for T {}

/// Shared application state accessible from all handlers.
pub struct AppState<S: Backend> {
    pub order_service: OrderService<S>,
    pub store: S,
    pub orders: OrderListView,
    pub returns: ReturnQueueView,
    processor: ProjectionProcessor<S>,
    catch_up: Mutex<()>,
}

impl<S: Backend> AppState<S> {
    /// Wires the order service and read models on top of `store`.
    pub fn new(store: S, catalog: InMemoryCatalog, policy: OrderPolicy) -> Self {
        let order_service =
            OrderService::new(store.clone(), Arc::new(catalog)).with_policy(policy);

        let orders = OrderListView::new();
        let returns = ReturnQueueView::new();
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(Box::new(orders.clone()));
        processor.register(Box::new(returns.clone()));

        Self {
            order_service,
            store,
            orders,
            returns,
            processor,
            catch_up: Mutex::new(()),
        }
    }

    /// Brings the read models up to date with the store.
    ///
    /// Views skip events their checkpoint already holds, so this is safe to
    /// call per request. Passes are serialized to avoid parallel log scans.
    pub async fn refresh_views(&self) -> Result<(), ApiError> {
        let _guard = self.catch_up.lock().await;
        self.processor.run_catch_up().await?;
        Ok(())
    }
}
