//! HTTP API for the storefront order engine.
//!
//! Exposes checkout, status changes, the return workflow and invoices, plus
//! projection-backed listings, with structured logging (tracing) and
//! Prometheus metrics.

pub mod caller;
pub mod config;
pub mod error;
pub mod routes;
pub mod seed;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{InMemoryCatalog, OrderPolicy};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, Backend};

use crate::error::ApiError;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Backend>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::checkout::<S>).get(routes::listings::all_orders::<S>),
        )
        .route("/orders/{id}/invoice", get(routes::orders::invoice::<S>))
        .route("/orders/{id}/status", post(routes::orders::set_status::<S>))
        .route("/orders/{id}/returns", post(routes::orders::submit_return::<S>))
        .route(
            "/orders/{id}/returns/approve",
            post(routes::orders::approve_return::<S>),
        )
        .route(
            "/orders/{id}/returns/reject",
            post(routes::orders::reject_return::<S>),
        )
        .route("/orders/{id}/events", get(routes::orders::events::<S>))
        .route(
            "/customers/{id}/orders",
            get(routes::listings::customer_orders::<S>),
        )
        .route("/returns/pending", get(routes::listings::pending_returns::<S>))
        .route(
            "/vouchers/resolve",
            post(routes::storefront::resolve_voucher::<S>),
        )
        .route(
            "/inventory/{product_id}",
            get(routes::storefront::stock_level::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state on `store`, seeding the demo catalog when asked.
pub async fn create_state<S: Backend>(
    store: S,
    policy: OrderPolicy,
    seed_demo: bool,
) -> Result<Arc<AppState<S>>, ApiError> {
    let catalog = InMemoryCatalog::new();
    if seed_demo {
        seed::seed_demo_catalog(&catalog, &store).await?;
    }

    let state = Arc::new(AppState::new(store, catalog, policy));
    state.refresh_views().await?;
    Ok(state)
}
