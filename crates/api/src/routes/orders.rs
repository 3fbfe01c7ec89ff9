//! Order actions: checkout, status changes, returns, invoice and history.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{
    ApproveReturn, CartLine, Checkout, CommandResult, CustomerSnapshot, Invoice, MediaRef, Order,
    OrderStatus, RejectReturn, SetStatus, SubmitReturn,
};
use serde::{Deserialize, Serialize};

use super::parse_order_id;
use crate::caller::CurrentCaller;
use crate::error::ApiError;
use crate::state::{AppState, Backend};

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub customer: CustomerSnapshot,
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub voucher_code: Option<String>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ReturnRequestBody {
    pub reason: String,
    #[serde(default)]
    pub media: Vec<MediaRef>,
}

// -- Response types --

/// Response type for event envelope data.
#[derive(Serialize)]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub version: i64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

// -- Handlers --

/// POST /orders: place an order for the calling customer.
#[tracing::instrument(skip(state, req), fields(caller = %caller))]
pub async fn checkout<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let mut cmd = Checkout::new(req.customer, req.lines);
    if let Some(code) = req.voucher_code {
        cmd = cmd.with_voucher(code);
    }

    let placed = state.order_service.checkout(&caller, cmd).await?;
    Ok((StatusCode::CREATED, invoice_of(placed)?))
}

/// GET /orders/{id}/invoice: invoice for the owner or an admin.
#[tracing::instrument(skip(state), fields(caller = %caller))]
pub async fn invoice<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let invoice = state.order_service.get_invoice(&caller, order_id).await?;
    Ok(Json(invoice))
}

/// POST /orders/{id}/status: move the order along the status table.
#[tracing::instrument(skip(state, req), fields(caller = %caller))]
pub async fn set_status<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<Invoice>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let target: OrderStatus = req.status.parse().map_err(ApiError::BadRequest)?;

    let mut cmd = SetStatus::new(order_id, target);
    if let Some(reason) = req.reason {
        cmd = cmd.with_reason(reason);
    }

    let result = state.order_service.set_status(&caller, cmd).await?;
    invoice_of(result)
}

/// POST /orders/{id}/returns: the owner asks to return a completed order.
#[tracing::instrument(skip(state, req), fields(caller = %caller))]
pub async fn submit_return<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    Json(req): Json<ReturnRequestBody>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let order_id = parse_order_id(&id)?;
    let cmd = SubmitReturn::new(order_id, req.reason).with_media(req.media);

    let result = state.order_service.submit_return(&caller, cmd).await?;
    Ok((StatusCode::CREATED, invoice_of(result)?))
}

/// POST /orders/{id}/returns/approve
#[tracing::instrument(skip(state), fields(caller = %caller))]
pub async fn approve_return<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let result = state
        .order_service
        .approve_return(&caller, ApproveReturn::new(order_id))
        .await?;
    invoice_of(result)
}

/// POST /orders/{id}/returns/reject
#[tracing::instrument(skip(state), fields(caller = %caller))]
pub async fn reject_return<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let result = state
        .order_service
        .reject_return(&caller, RejectReturn::new(order_id))
        .await?;
    invoice_of(result)
}

/// GET /orders/{id}/events: the stored history of an order. Admin only.
#[tracing::instrument(skip(state), fields(caller = %caller))]
pub async fn events<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let envelopes = state.order_service.order_events(&caller, order_id).await?;

    let responses = envelopes
        .into_iter()
        .map(|e| EventEnvelopeResponse {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        })
        .collect();

    Ok(Json(responses))
}

fn invoice_of(result: CommandResult<Order>) -> Result<Json<Invoice>, ApiError> {
    Ok(Json(Invoice::project(&result.aggregate)?))
}
