//! HTTP route handlers.

pub mod health;
pub mod listings;
pub mod metrics;
pub mod orders;
pub mod storefront;

use common::AggregateId;

use crate::error::ApiError;

fn parse_order_id(id: &str) -> Result<AggregateId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}
