//! Order commands.

use common::AggregateId;

use crate::command::Command;

use super::{CartLine, CustomerSnapshot, MediaRef, Order, OrderStatus};

/// Command to turn a cart into a placed order.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// The order ID to create.
    pub order_id: AggregateId,

    pub customer: CustomerSnapshot,

    pub lines: Vec<CartLine>,

    /// Optional voucher code. Blank codes are treated as absent.
    pub voucher_code: Option<String>,
}

impl Checkout {
    /// Creates a checkout with a freshly generated order ID.
    pub fn new(customer: CustomerSnapshot, lines: Vec<CartLine>) -> Self {
        Self {
            order_id: AggregateId::new(),
            customer,
            lines,
            voucher_code: None,
        }
    }

    pub fn with_voucher(mut self, code: impl Into<String>) -> Self {
        self.voucher_code = Some(code.into());
        self
    }

    /// The voucher code to resolve, if a non-blank one was given.
    pub fn voucher(&self) -> Option<&str> {
        self.voucher_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

impl Command for Checkout {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to move an order along the status table.
#[derive(Debug, Clone)]
pub struct SetStatus {
    pub order_id: AggregateId,

    pub target: OrderStatus,

    /// Recorded when cancelling.
    pub reason: Option<String>,
}

impl SetStatus {
    pub fn new(order_id: AggregateId, target: OrderStatus) -> Self {
        Self {
            order_id,
            target,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl Command for SetStatus {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to request a return for a completed order.
#[derive(Debug, Clone)]
pub struct SubmitReturn {
    pub order_id: AggregateId,

    pub reason: String,

    pub media: Vec<MediaRef>,
}

impl SubmitReturn {
    pub fn new(order_id: AggregateId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            reason: reason.into(),
            media: Vec::new(),
        }
    }

    pub fn with_media(mut self, media: Vec<MediaRef>) -> Self {
        self.media = media;
        self
    }
}

impl Command for SubmitReturn {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to approve a requested return.
#[derive(Debug, Clone, Copy)]
pub struct ApproveReturn {
    pub order_id: AggregateId,
}

impl ApproveReturn {
    pub fn new(order_id: AggregateId) -> Self {
        Self { order_id }
    }
}

impl Command for ApproveReturn {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to reject a requested return.
#[derive(Debug, Clone, Copy)]
pub struct RejectReturn {
    pub order_id: AggregateId,
}

impl RejectReturn {
    pub fn new(order_id: AggregateId) -> Self {
        Self { order_id }
    }
}

impl Command for RejectReturn {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}
