//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind, OrderError};
use projections::ProjectionError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request: bad IDs, headers or query values.
    #[error("{0}")]
    BadRequest(String),
    /// Resource that is not an order (orders go through `Domain`).
    #[error("{0}")]
    NotFound(String),
    /// Error raised by the order service.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Read model could not be brought up to date.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadRequest(_) => ErrorKind::Validation,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Domain(err) => err.kind(),
            ApiError::Projection(_) | ApiError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = %self, "internal server error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        metrics::counter!("api_errors_total", "kind" => kind.as_str()).increment(1);

        let body = serde_json::json!({ "error": kind.as_str(), "message": message });
        (status_for(kind), axum::Json(body)).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Domain(err.into())
    }
}
