//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::pricing::{OrderSummary, VoucherApplication};

use super::{CustomerSnapshot, MediaRef, OrderLineItem, OrderStatus};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Checkout succeeded and stock was taken.
    OrderPlaced(OrderPlacedData),

    OrderPaid(OrderPaidData),

    OrderCompleted(OrderCompletedData),

    /// Cancelled by an admin. Stock is not given back.
    OrderCancelled(OrderCancelledData),

    ReturnRequested(ReturnRequestedData),

    /// Refund granted and stock restored.
    ReturnApproved(ReturnApprovedData),

    ReturnRejected(ReturnRejectedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderPaid(_) => "OrderPaid",
            OrderEvent::OrderCompleted(_) => "OrderCompleted",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::ReturnRequested(_) => "ReturnRequested",
            OrderEvent::ReturnApproved(_) => "ReturnApproved",
            OrderEvent::ReturnRejected(_) => "ReturnRejected",
        }
    }
}

/// Data for OrderPlaced event. Holds every snapshot the invoice is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderLineItem>,
    pub voucher: Option<VoucherApplication>,
    pub summary: OrderSummary,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaidData {
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCompletedData {
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub cancelled_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequestedData {
    pub reason: String,
    pub media: Vec<MediaRef>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnApprovedData {
    pub refunded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRejectedData {
    pub rejected_at: DateTime<Utc>,
}

impl OrderEvent {
    /// The event that moves an order into `target`.
    ///
    /// Returns `None` for `Pending`, which is only ever entered by
    /// [`OrderEvent::OrderPlaced`].
    pub fn status_changed(
        target: OrderStatus,
        at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Option<Self> {
        match target {
            OrderStatus::Pending => None,
            OrderStatus::Paid => Some(OrderEvent::OrderPaid(OrderPaidData { paid_at: at })),
            OrderStatus::Completed => Some(OrderEvent::OrderCompleted(OrderCompletedData {
                completed_at: at,
            })),
            OrderStatus::Cancelled => Some(OrderEvent::OrderCancelled(OrderCancelledData {
                cancelled_at: at,
                reason,
            })),
        }
    }

    pub fn return_requested(reason: String, media: Vec<MediaRef>, at: DateTime<Utc>) -> Self {
        OrderEvent::ReturnRequested(ReturnRequestedData {
            reason,
            media,
            requested_at: at,
        })
    }

    pub fn return_approved(at: DateTime<Utc>) -> Self {
        OrderEvent::ReturnApproved(ReturnApprovedData { refunded_at: at })
    }

    pub fn return_rejected(at: DateTime<Utc>) -> Self {
        OrderEvent::ReturnRejected(ReturnRejectedData { rejected_at: at })
    }
}
