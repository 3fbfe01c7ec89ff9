//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod policy;
mod service;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::{ApproveReturn, Checkout, RejectReturn, SetStatus, SubmitReturn};
pub use events::{
    OrderCancelledData, OrderCompletedData, OrderEvent, OrderPaidData, OrderPlacedData,
    ReturnApprovedData, ReturnRejectedData, ReturnRequestedData,
};
pub use policy::OrderPolicy;
pub use service::OrderService;
pub use state::{OrderStatus, ReturnStatus};
pub use value_objects::{
    CartLine, CustomerId, CustomerKind, CustomerSnapshot, MAX_RETURN_MEDIA, MediaRef,
    OrderLineItem, ProductId, ReturnRequest,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::ErrorKind;
use crate::pricing::PricingError;

/// Why an order cannot enter the return workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnIneligibility {
    #[error("order is {status}, only COMPLETED orders can be returned")]
    NotCompleted { status: OrderStatus },

    #[error("a return was already submitted for this order (return status {return_status})")]
    AlreadyRequested { return_status: ReturnStatus },

    #[error("return window expired at {deadline}")]
    WindowExpired { deadline: DateTime<Utc> },
}

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order has not been placed")]
    NotPlaced,

    #[error("Order has no items")]
    NoItems,

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Invalid customer: {0}")]
    InvalidCustomer(String),

    #[error("{from} → {to} is not allowed")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Return not eligible: {0}")]
    ReturnNotEligible(ReturnIneligibility),

    #[error("Invalid return request: {0}")]
    InvalidReturnRequest(String),

    #[error("Cannot {action} a return in status {current}")]
    InvalidReturnTransition {
        current: ReturnStatus,
        action: &'static str,
    },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NoItems
            | OrderError::Pricing(_)
            | OrderError::InvalidCustomer(_)
            | OrderError::InvalidReturnRequest(_) => ErrorKind::Validation,
            OrderError::AlreadyPlaced
            | OrderError::InvalidTransition { .. }
            | OrderError::ReturnNotEligible(_)
            | OrderError::InvalidReturnTransition { .. } => ErrorKind::Conflict,
            OrderError::NotPlaced => ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_message_names_the_pair() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Paid,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "PAID → PENDING is not allowed");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn ineligibility_messages_are_distinct() {
        let not_completed = OrderError::ReturnNotEligible(ReturnIneligibility::NotCompleted {
            status: OrderStatus::Paid,
        });
        let expired = OrderError::ReturnNotEligible(ReturnIneligibility::WindowExpired {
            deadline: Utc::now(),
        });
        assert!(not_completed.to_string().contains("only COMPLETED orders"));
        assert!(expired.to_string().contains("return window expired"));
    }
}
