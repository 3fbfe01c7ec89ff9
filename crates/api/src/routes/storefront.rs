//! Voucher preview and stock lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{DomainError, Money, VoucherResolution};
use serde::{Deserialize, Serialize};

use crate::caller::CurrentCaller;
use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Deserialize)]
pub struct ResolveVoucherRequest {
    pub code: String,
    /// Pre-tax subtotal in minor units.
    pub subtotal: Money,
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub product_id: String,
    pub available: u32,
}

/// POST /vouchers/resolve: what a code would do to a subtotal. No side effects.
#[tracing::instrument(skip(state, req))]
pub async fn resolve_voucher<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ResolveVoucherRequest>,
) -> Result<Json<VoucherResolution>, ApiError> {
    let resolution = state
        .order_service
        .preview_voucher(&req.code, req.subtotal)?;
    Ok(Json(resolution))
}

/// GET /inventory/{product_id}: current stock level. Admin only.
#[tracing::instrument(skip(state), fields(caller = %caller))]
pub async fn stock_level<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    CurrentCaller(caller): CurrentCaller,
    Path(product_id): Path<String>,
) -> Result<Json<StockResponse>, ApiError> {
    if !state.order_service.authorizer().is_admin(&caller) {
        return Err(ApiError::Domain(DomainError::Forbidden(
            "only admins can read stock levels".to_string(),
        )));
    }

    let available = state
        .store
        .stock_level(&product_id)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("No stock record for {product_id}")))?;

    Ok(Json(StockResponse {
        product_id,
        available,
    }))
}
