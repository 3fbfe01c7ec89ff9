//! Caller identity taken from request headers.
//!
//! Authentication happens upstream; the gateway forwards who the caller is:
//! `x-role: admin` (with an optional `x-admin-name`) for staff, or
//! `x-customer-id: <uuid>` for a signed-in customer. Anything else is
//! anonymous.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::{Caller, CustomerId};

use crate::error::ApiError;

pub const ROLE_HEADER: &str = "x-role";
pub const ADMIN_NAME_HEADER: &str = "x-admin-name";
pub const CUSTOMER_HEADER: &str = "x-customer-id";

/// Extractor for the calling identity.
#[derive(Debug, Clone)]
pub struct CurrentCaller(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for CurrentCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<Option<String>, ApiError> {
            parts
                .headers
                .get(name)
                .map(|value| {
                    value
                        .to_str()
                        .map(|v| v.trim().to_string())
                        .map_err(|_| ApiError::BadRequest(format!("{name} is not valid text")))
                })
                .transpose()
        };

        if header(ROLE_HEADER)?.is_some_and(|role| role.eq_ignore_ascii_case("admin")) {
            let name = header(ADMIN_NAME_HEADER)?
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "admin".to_string());
            return Ok(Self(Caller::Admin(name)));
        }

        match header(CUSTOMER_HEADER)? {
            Some(raw) => raw
                .parse::<CustomerId>()
                .map(|id| Self(Caller::Customer(id)))
                .map_err(|e| ApiError::BadRequest(format!("Invalid {CUSTOMER_HEADER}: {e}"))),
            None => Ok(Self(Caller::Anonymous)),
        }
    }
}
