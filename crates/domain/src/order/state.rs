//! Order status and return status state machines.
//!
//! Each machine has exactly one transition table. Everything else
//! (validation, allowed actions, UI hints) is derived from it.

use serde::{Deserialize, Serialize};

/// Fulfilment status of an order.
///
/// ```text
/// Pending ──► Paid ──► Completed
///    │          │
///    └──────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Completed,
    Cancelled,
}

const ORDER_TRANSITIONS: &[(OrderStatus, OrderStatus)] = &[
    (OrderStatus::Pending, OrderStatus::Paid),
    (OrderStatus::Paid, OrderStatus::Completed),
    (OrderStatus::Pending, OrderStatus::Cancelled),
    (OrderStatus::Paid, OrderStatus::Cancelled),
];

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        ORDER_TRANSITIONS.contains(&(*self, target))
    }

    /// Statuses reachable in one step, in table order.
    pub fn allowed_transitions(&self) -> Vec<OrderStatus> {
        ORDER_TRANSITIONS
            .iter()
            .filter(|(from, _)| from == self)
            .map(|(_, to)| *to)
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// Progress of the single return a completed order may have.
///
/// ```text
/// None ──► Requested ──► Approved
///               │
///               └──────► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    #[default]
    None,
    Requested,
    Approved,
    Rejected,
}

const RETURN_TRANSITIONS: &[(ReturnStatus, ReturnStatus)] = &[
    (ReturnStatus::None, ReturnStatus::Requested),
    (ReturnStatus::Requested, ReturnStatus::Approved),
    (ReturnStatus::Requested, ReturnStatus::Rejected),
];

impl ReturnStatus {
    pub fn can_transition_to(&self, target: ReturnStatus) -> bool {
        RETURN_TRANSITIONS.contains(&(*self, target))
    }

    pub fn allowed_transitions(&self) -> Vec<ReturnStatus> {
        RETURN_TRANSITIONS
            .iter()
            .filter(|(from, _)| from == self)
            .map(|(_, to)| *to)
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::None => "NONE",
            ReturnStatus::Requested => "REQUESTED",
            ReturnStatus::Approved => "APPROVED",
            ReturnStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
