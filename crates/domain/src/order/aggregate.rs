//! Order aggregate implementation.

use chrono::{DateTime, Duration, Utc};
use common::AggregateId;
use event_store::{StockChange, Version};

use crate::aggregate::Aggregate;
use crate::command::Decision;
use crate::pricing::{self, OrderSummary, VoucherApplication};

use super::{
    CustomerSnapshot, MAX_RETURN_MEDIA, MediaRef, OrderError, OrderEvent, OrderLineItem,
    OrderStatus, ReturnIneligibility, ReturnRequest, ReturnStatus, events::OrderPlacedData,
};

/// Order aggregate root.
///
/// Holds the customer, line and voucher snapshots taken at checkout together
/// with the fulfilment and return state machines.
#[derive(Debug, Clone, Default)]
pub struct Order {
    id: Option<AggregateId>,
    version: Version,
    customer: Option<CustomerSnapshot>,
    items: Vec<OrderLineItem>,
    voucher: Option<VoucherApplication>,
    summary: OrderSummary,
    status: OrderStatus,
    return_status: ReturnStatus,
    return_request: Option<ReturnRequest>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::OrderPaid(data) => {
                self.status = OrderStatus::Paid;
                self.paid_at = Some(data.paid_at);
            }
            OrderEvent::OrderCompleted(data) => {
                self.status = OrderStatus::Completed;
                self.completed_at.get_or_insert(data.completed_at);
            }
            OrderEvent::OrderCancelled(data) => {
                self.status = OrderStatus::Cancelled;
                self.cancelled_at = Some(data.cancelled_at);
                self.cancellation_reason = data.reason;
            }
            OrderEvent::ReturnRequested(data) => {
                self.return_status = ReturnStatus::Requested;
                self.return_request = Some(ReturnRequest {
                    reason: data.reason,
                    media: data.media,
                    requested_at: data.requested_at,
                });
            }
            OrderEvent::ReturnApproved(data) => {
                self.return_status = ReturnStatus::Approved;
                self.refunded_at.get_or_insert(data.refunded_at);
            }
            OrderEvent::ReturnRejected(_) => {
                self.return_status = ReturnStatus::Rejected;
            }
        }
    }
}

// Query methods
impl Order {
    pub fn customer(&self) -> Option<&CustomerSnapshot> {
        self.customer.as_ref()
    }

    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn voucher(&self) -> Option<&VoucherApplication> {
        self.voucher.as_ref()
    }

    pub fn summary(&self) -> &OrderSummary {
        &self.summary
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn return_status(&self) -> ReturnStatus {
        self.return_status
    }

    pub fn return_request(&self) -> Option<&ReturnRequest> {
        self.return_request.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    pub fn is_owned_by(&self, customer_id: super::CustomerId) -> bool {
        self.customer
            .as_ref()
            .is_some_and(|c| c.customer_id == customer_id)
    }

    /// Last instant a return may be requested, counted from completion (or
    /// from placement for orders without a completion time).
    pub fn return_deadline(&self, window: Duration) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at) + window
    }

    /// Stock to put back when a return is approved.
    pub fn restock_changes(&self) -> Vec<StockChange> {
        self.items
            .iter()
            .map(|item| StockChange::increment(item.product_id.as_str(), item.quantity))
            .collect()
    }

    fn ensure_placed(&self) -> Result<(), OrderError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(OrderError::NotPlaced),
        }
    }
}

// Command methods (return events)
impl Order {
    /// Places a new order from already-snapshotted lines.
    ///
    /// Totals are always recomputed here; stock for every line is taken in
    /// the same write.
    pub fn place(
        &self,
        order_id: AggregateId,
        customer: CustomerSnapshot,
        items: Vec<OrderLineItem>,
        voucher: Option<VoucherApplication>,
        now: DateTime<Utc>,
    ) -> Result<Decision<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        customer.validate()?;

        let lines: Vec<_> = items.iter().map(OrderLineItem::pricing).collect();
        let discount = voucher.as_ref().map(|v| v.discount).unwrap_or_default();
        let summary = pricing::summarize(&lines, discount)?;

        let stock_changes = items
            .iter()
            .map(|item| StockChange::decrement(item.product_id.as_str(), item.quantity))
            .collect();

        Ok(
            Decision::new(vec![OrderEvent::OrderPlaced(OrderPlacedData {
                order_id,
                customer,
                items,
                voucher,
                summary,
                placed_at: now,
            })])
            .with_stock_changes(stock_changes),
        )
    }

    /// Moves the order to `target` if the status table has that edge.
    ///
    /// `reason` is only recorded for cancellations.
    pub fn transition(
        &self,
        target: OrderStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        let invalid = OrderError::InvalidTransition {
            from: self.status,
            to: target,
        };
        if !self.status.can_transition_to(target) {
            return Err(invalid);
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        OrderEvent::status_changed(target, now, reason)
            .map(|event| vec![event])
            .ok_or(invalid)
    }

    /// Opens a return on a completed order inside the return window.
    pub fn request_return(
        &self,
        reason: &str,
        media: Vec<MediaRef>,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_placed()?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(OrderError::InvalidReturnRequest(
                "reason must not be empty".to_string(),
            ));
        }
        if media.len() > MAX_RETURN_MEDIA {
            return Err(OrderError::InvalidReturnRequest(format!(
                "at most {MAX_RETURN_MEDIA} media files may be attached, got {}",
                media.len()
            )));
        }

        if self.status != OrderStatus::Completed {
            return Err(OrderError::ReturnNotEligible(
                ReturnIneligibility::NotCompleted {
                    status: self.status,
                },
            ));
        }
        if !self.return_status.can_transition_to(ReturnStatus::Requested) {
            return Err(OrderError::ReturnNotEligible(
                ReturnIneligibility::AlreadyRequested {
                    return_status: self.return_status,
                },
            ));
        }
        let deadline = self.return_deadline(window);
        if now > deadline {
            return Err(OrderError::ReturnNotEligible(
                ReturnIneligibility::WindowExpired { deadline },
            ));
        }

        Ok(vec![OrderEvent::return_requested(
            reason.to_string(),
            media,
            now,
        )])
    }

    /// Approves the pending return, refunding and restocking every line.
    pub fn approve_return(&self, now: DateTime<Utc>) -> Result<Decision<OrderEvent>, OrderError> {
        self.ensure_return_transition(ReturnStatus::Approved, "approve")?;
        Ok(Decision::new(vec![OrderEvent::return_approved(now)])
            .with_stock_changes(self.restock_changes()))
    }

    pub fn reject_return(&self, now: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_return_transition(ReturnStatus::Rejected, "reject")?;
        Ok(vec![OrderEvent::return_rejected(now)])
    }

    fn ensure_return_transition(
        &self,
        target: ReturnStatus,
        action: &'static str,
    ) -> Result<(), OrderError> {
        self.ensure_placed()?;
        if self.return_status.can_transition_to(target) {
            Ok(())
        } else {
            Err(OrderError::InvalidReturnTransition {
                current: self.return_status,
                action,
            })
        }
    }
}

impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.customer = Some(data.customer);
        self.items = data.items;
        self.voucher = data.voucher;
        self.summary = data.summary;
        self.status = OrderStatus::Pending;
        self.return_status = ReturnStatus::None;
        self.created_at = data.placed_at;
    }
}
