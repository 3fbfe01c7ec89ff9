//! Domain error types.

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::order::{OrderError, ProductId};
use crate::pricing::{PricingError, VoucherRejection};

/// Coarse classification used by callers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal_error",
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(EventStoreError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Order not found: {0}")]
    OrderNotFound(AggregateId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Out of stock: {product_id} (requested {requested}, available {available})")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("Voucher {code} is invalid: {reason}")]
    VoucherInvalid {
        code: String,
        reason: VoucherRejection,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(e) => e.kind(),
            DomainError::OrderNotFound(_) | DomainError::ProductNotFound(_) => ErrorKind::NotFound,
            DomainError::OutOfStock { .. } | DomainError::VoucherInvalid { .. } => {
                ErrorKind::Conflict
            }
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
                ErrorKind::Conflict
            }
            DomainError::EventStore(_) | DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

impl From<EventStoreError> for DomainError {
    fn from(e: EventStoreError) -> Self {
        match e {
            EventStoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => DomainError::OutOfStock {
                product_id: ProductId::new(product_id),
                requested,
                available,
            },
            EventStoreError::UnknownProduct(product_id) => {
                DomainError::ProductNotFound(ProductId::new(product_id))
            }
            other => DomainError::EventStore(other),
        }
    }
}

impl From<PricingError> for DomainError {
    fn from(e: PricingError) -> Self {
        DomainError::Order(OrderError::Pricing(e))
    }
}
