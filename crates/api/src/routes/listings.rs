//! Projection-backed listings: orders and the pending return queue.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::{CustomerId, DomainError, OrderStatus};
use projections::{OrderListEntry, PendingReturn};
use serde::Deserialize;

use crate::caller::CurrentCaller;
use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

impl StatusFilter {
    fn parse(&self) -> Result<Option<OrderStatus>, ApiError> {
        self.status
            .as_deref()
            .map(|s| s.parse().map_err(ApiError::BadRequest))
            .transpose()
    }
}

/// GET /orders: every order, newest first. Admin only.
#[tracing::instrument(skip(state), fields(caller = %caller))]
pub async fn all_orders<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<OrderListEntry>>, ApiError> {
    if !state.order_service.authorizer().is_admin(&caller) {
        return Err(forbidden("only admins can list all orders"));
    }
    let status = filter.parse()?;

    state.refresh_views().await?;
    Ok(Json(state.orders.list(status).await))
}

/// GET /customers/{id}/orders: one customer's orders, for that customer or an admin.
#[tracing::instrument(skip(state), fields(caller = %caller))]
pub async fn customer_orders<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<OrderListEntry>>, ApiError> {
    let customer_id: CustomerId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer ID: {e}")))?;
    let authorizer = state.order_service.authorizer();
    if !authorizer.is_admin(&caller) && !authorizer.acts_for(&caller, customer_id) {
        return Err(forbidden("these orders belong to another customer"));
    }
    let status = filter.parse()?;

    state.refresh_views().await?;
    Ok(Json(state.orders.list_for_customer(customer_id, status).await))
}

/// GET /returns/pending: returns awaiting a decision, oldest first. Admin only.
#[tracing::instrument(skip(state), fields(caller = %caller))]
pub async fn pending_returns<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<Vec<PendingReturn>>, ApiError> {
    if !state.order_service.authorizer().is_admin(&caller) {
        return Err(forbidden("only admins can review returns"));
    }

    state.refresh_views().await?;
    Ok(Json(state.returns.pending().await))
}

fn forbidden(message: &str) -> ApiError {
    ApiError::Domain(DomainError::Forbidden(message.to_string()))
}
