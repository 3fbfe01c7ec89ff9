//! Pending return queue for admins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{CustomerId, MediaRef, Money, OrderEvent};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::projection::{Checkpoint, Projection};
use crate::{ProjectionError, Result};
use crate::read_model::ReadModel;

/// A return waiting for an admin decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingReturn {
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub reason: String,
    pub media: Vec<MediaRef>,
    pub requested_at: DateTime<Utc>,
    /// Amount refunded if approved: the order total as charged.
    pub refund_amount: Money,
}

#[derive(Debug, Clone)]
struct OrderRef {
    customer_id: CustomerId,
    customer_name: String,
    total: Money,
}

#[derive(Default)]
struct ReturnQueueState {
    orders: HashMap<AggregateId, OrderRef>,
    pending: HashMap<AggregateId, PendingReturn>,
    checkpoint: Checkpoint,
}

/// Returns in REQUESTED state, oldest request first.
#[derive(Clone, Default)]
pub struct ReturnQueueView {
    state: Arc<RwLock<ReturnQueueState>>,
}

impl ReturnQueueView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pending(&self) -> Vec<PendingReturn> {
        let state = self.state.read().await;
        let mut queue: Vec<_> = state.pending.values().cloned().collect();
        queue.sort_by_key(|r| r.requested_at);
        queue
    }

    pub async fn get(&self, order_id: AggregateId) -> Option<PendingReturn> {
        self.state.read().await.pending.get(&order_id).cloned()
    }
}

#[async_trait]
impl Projection for ReturnQueueView {
    fn name(&self) -> &'static str {
        "ReturnQueueView"
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
                    OrderRef {
                        customer_id: data.customer.customer_id,
                        customer_name: data.customer.name,
                        total: data.summary.total,
                    },
                );
            }
            OrderEvent::ReturnRequested(data) => {
                let Some(order) = state.orders.get(&order_id).cloned() else {
                    tracing::warn!(%order_id, "return requested for unknown order");
                    return Ok(true);
                };
                state.pending.insert(
                    order_id,
                    PendingReturn {
                        order_id,
                        customer_id: order.customer_id,
                        customer_name: order.customer_name,
                        reason: data.reason,
                        media: data.media,
                        requested_at: data.requested_at,
                        refund_amount: order.total,
                    },
                );
            }
            OrderEvent::ReturnApproved(_) | OrderEvent::ReturnRejected(_) => {
                state.pending.remove(&order_id);
            }
            OrderEvent::OrderPaid(_)
            | OrderEvent::OrderCompleted(_)
            | OrderEvent::OrderCancelled(_) => {}
        }
        Ok(true)
    }

    async fn checkpoint(&self) -> Checkpoint {
        self.state.read().await.checkpoint.clone()
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.pending.clear();
        state.checkpoint = Checkpoint::new();
        Ok(())
    }
}

impl ReadModel for ReturnQueueView {
    fn name(&self) -> &'static str {
        "ReturnQueueView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.pending.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{envelope, placed};
    use chrono::Duration;

    async fn requested(view: &ReturnQueueView, order_id: AggregateId, at: DateTime<Utc>) {
        view.handle(&envelope(order_id, 1, &placed(order_id, CustomerId::new(), at)))
            .await
            .unwrap();
        let event = OrderEvent::return_requested(
            "faded after one wash".to_string(),
            vec![MediaRef::new("photos/1.jpg")],
            at,
        );
        view.handle(&envelope(order_id, 4, &event)).await.unwrap();
    }

    #[tokio::test]
    async fn requested_returns_queue_oldest_first() {
        let view = ReturnQueueView::new();
        let start = Utc::now();
        let later = AggregateId::new();
        let earlier = AggregateId::new();

        requested(&view, later, start + Duration::hours(3)).await;
        requested(&view, earlier, start).await;

        let queue = view.pending().await;
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].order_id, earlier);
        assert_eq!(queue[0].refund_amount, Money::new(440_000));
        assert_eq!(queue[0].media.len(), 1);
        assert_eq!(view.count(), 2);
    }

    #[tokio::test]
    async fn resolved_returns_leave_the_queue() {
        let view = ReturnQueueView::new();
        let approved = AggregateId::new();
        let rejected = AggregateId::new();
        let now = Utc::now();
        requested(&view, approved, now).await;
        requested(&view, rejected, now).await;

        view.handle(&envelope(approved, 5, &OrderEvent::return_approved(now)))
            .await
            .unwrap();
        view.handle(&envelope(rejected, 5, &OrderEvent::return_rejected(now)))
            .await
            .unwrap();

        assert!(view.pending().await.is_empty());
        assert!(view.get(approved).await.is_none());
    }

    #[tokio::test]
    async fn request_for_unseen_order_is_skipped() {
        let view = ReturnQueueView::new();
        let order_id = AggregateId::new();
        let event = OrderEvent::return_requested("late".to_string(), vec![], Utc::now());

        view.handle(&envelope(order_id, 1, &event)).await.unwrap();

        assert!(view.pending().await.is_empty());
        assert_eq!(view.checkpoint().await.events_applied(), 1);
    }
}
