//! Order list read model: one row per placed order, for customer and admin
//! listings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{CustomerId, Money, OrderEvent, OrderStatus, ReturnStatus};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::projection::{Checkpoint, Projection};
use crate::{ProjectionError, Result};
use crate::read_model::ReadModel;

/// One order as shown in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderListEntry {
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub status: OrderStatus,
    pub return_status: ReturnStatus,
    pub item_count: usize,
    pub total: Money,
    pub voucher_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct OrderListState {
    orders: HashMap<AggregateId, OrderListEntry>,
    checkpoint: Checkpoint,
}

/// Read model view listing every placed order.
///
/// Listings are sorted newest first. Terminal orders stay in the view.
#[derive(Clone, Default)]
pub struct OrderListView {
    state: Arc<RwLock<OrderListState>>,
}

impl OrderListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_order(&self, order_id: AggregateId) -> Option<OrderListEntry> {
        self.state.read().await.orders.get(&order_id).cloned()
    }

    /// All orders, optionally narrowed to one status.
    pub async fn list(&self, status: Option<OrderStatus>) -> Vec<OrderListEntry> {
        self.collect(|entry| status.is_none_or(|s| entry.status == s))
            .await
    }

    /// Orders placed by one customer, optionally narrowed to one status.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        status: Option<OrderStatus>,
    ) -> Vec<OrderListEntry> {
        self.collect(|entry| {
            entry.customer_id == customer_id && status.is_none_or(|s| entry.status == s)
        })
        .await
    }

    async fn collect(&self, keep: impl Fn(&OrderListEntry) -> bool) -> Vec<OrderListEntry> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state.orders.values().filter(|e| keep(e)).cloned().collect();
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.order_id.as_uuid().cmp(&b.order_id.as_uuid()))
        });
        entries
    }
}

#[async_trait]
impl Projection for OrderListView {
    fn name(&self) -> &'static str {
        "OrderListView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.checkpoint.has_applied(event) {
            return Ok(false);
        }
        if event.aggregate_type != "Order" {
            state.checkpoint.record(event);
            return Ok(true);
        }

        let order_event: OrderEvent = serde_json::from_value(event.payload.clone())
            .map_err(|e| ProjectionError::unreadable(event, e))?;
        let order_id = event.aggregate_id;
        state.checkpoint.record(event);

        match order_event {
            OrderEvent::OrderPlaced(data) => {
                state.orders.insert(
                    order_id,
                    OrderListEntry {
                        order_id,
                        customer_id: data.customer.customer_id,
                        customer_name: data.customer.name,
                        status: OrderStatus::Pending,
                        return_status: ReturnStatus::None,
                        item_count: data.items.len(),
                        total: data.summary.total,
                        voucher_code: data.voucher.map(|v| v.code),
                        created_at: data.placed_at,
                        updated_at: data.placed_at,
                    },
                );
            }
            change => match state.orders.get_mut(&order_id) {
                Some(entry) => apply_change(entry, change),
                None => {
                    tracing::warn!(
                        %order_id,
                        event_type = %event.event_type,
                        "event for unknown order"
                    );
                }
            },
        }
        Ok(true)
    }

    async fn checkpoint(&self) -> Checkpoint {
        self.state.read().await.checkpoint.clone()
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.checkpoint = Checkpoint::new();
        Ok(())
    }
}

fn apply_change(entry: &mut OrderListEntry, event: OrderEvent) {
    let at = match event {
        OrderEvent::OrderPlaced(data) => data.placed_at,
        OrderEvent::OrderPaid(data) => {
            entry.status = OrderStatus::Paid;
            data.paid_at
        }
        OrderEvent::OrderCompleted(data) => {
            entry.status = OrderStatus::Completed;
            data.completed_at
        }
        OrderEvent::OrderCancelled(data) => {
            entry.status = OrderStatus::Cancelled;
            data.cancelled_at
        }
        OrderEvent::ReturnRequested(data) => {
            entry.return_status = ReturnStatus::Requested;
            data.requested_at
        }
        OrderEvent::ReturnApproved(data) => {
            entry.return_status = ReturnStatus::Approved;
            data.refunded_at
        }
        OrderEvent::ReturnRejected(data) => {
            entry.return_status = ReturnStatus::Rejected;
            data.rejected_at
        }
    };
    entry.updated_at = at;
}

impl ReadModel for OrderListView {
    fn name(&self) -> &'static str {
        "OrderListView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.orders.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{envelope, placed};
    use chrono::Duration;

    #[tokio::test]
    async fn placed_order_is_listed_as_pending() {
        let view = OrderListView::new();
        let customer = CustomerId::new();
        let order_id = AggregateId::new();
        let at = Utc::now();

        view.handle(&envelope(order_id, 1, &placed(order_id, customer, at)))
            .await
            .unwrap();

        let entry = view.get_order(order_id).await.unwrap();
        assert_eq!(entry.status, OrderStatus::Pending);
        assert_eq!(entry.return_status, ReturnStatus::None);
        assert_eq!(entry.total, Money::new(440_000));
        assert_eq!(entry.item_count, 1);
        assert_eq!(view.count(), 1);
    }

    #[tokio::test]
    async fn status_and_return_changes_update_the_row() {
        let view = OrderListView::new();
        let order_id = AggregateId::new();
        let at = Utc::now();
        let events = [
            placed(order_id, CustomerId::new(), at),
            OrderEvent::status_changed(OrderStatus::Paid, at, None).unwrap(),
            OrderEvent::status_changed(OrderStatus::Completed, at, None).unwrap(),
            OrderEvent::return_requested("scratched".to_string(), vec![], at + Duration::days(1)),
        ];
        for (i, event) in events.iter().enumerate() {
            view.handle(&envelope(order_id, i as i64 + 1, event))
                .await
                .unwrap();
        }

        let entry = view.get_order(order_id).await.unwrap();
        assert_eq!(entry.status, OrderStatus::Completed);
        assert_eq!(entry.return_status, ReturnStatus::Requested);
        assert_eq!(entry.updated_at, at + Duration::days(1));
    }

    #[tokio::test]
    async fn listings_filter_by_customer_and_status() {
        let view = OrderListView::new();
        let alice = CustomerId::new();
        let bob = CustomerId::new();
        let start = Utc::now();

        let older = AggregateId::new();
        let newer = AggregateId::new();
        let bobs = AggregateId::new();
        view.handle(&envelope(older, 1, &placed(older, alice, start)))
            .await
            .unwrap();
        view.handle(&envelope(newer, 1, &placed(newer, alice, start + Duration::hours(1))))
            .await
            .unwrap();
        view.handle(&envelope(bobs, 1, &placed(bobs, bob, start)))
            .await
            .unwrap();
        let cancel = OrderEvent::status_changed(OrderStatus::Cancelled, start, None).unwrap();
        view.handle(&envelope(older, 2, &cancel)).await.unwrap();

        let alices: Vec<_> = view
            .list_for_customer(alice, None)
            .await
            .into_iter()
            .map(|e| e.order_id)
            .collect();
        assert_eq!(alices, vec![newer, older]);

        let pending = view.list_for_customer(alice, Some(OrderStatus::Pending)).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order_id, newer);

        assert_eq!(view.list(None).await.len(), 3);
        assert_eq!(view.list(Some(OrderStatus::Cancelled)).await.len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_rows_and_checkpoint() {
        let view = OrderListView::new();
        let order_id = AggregateId::new();
        view.handle(&envelope(order_id, 1, &placed(order_id, CustomerId::new(), Utc::now())))
            .await
            .unwrap();

        view.reset().await.unwrap();

        assert!(view.list(None).await.is_empty());
        assert_eq!(view.checkpoint().await, Checkpoint::new());
    }

    #[tokio::test]
    async fn redelivered_events_are_not_applied_twice() {
        let view = OrderListView::new();
        let order_id = AggregateId::new();
        let at = Utc::now();
        let first = envelope(order_id, 1, &placed(order_id, CustomerId::new(), at));
        let paid = OrderEvent::status_changed(OrderStatus::Paid, at, None).unwrap();
        let second = envelope(order_id, 2, &paid);

        assert!(view.handle(&first).await.unwrap());
        assert!(view.handle(&second).await.unwrap());
        assert!(!view.handle(&first).await.unwrap());

        let entry = view.get_order(order_id).await.unwrap();
        assert_eq!(entry.status, OrderStatus::Paid);
        assert_eq!(view.checkpoint().await.events_applied(), 2);
    }
}
