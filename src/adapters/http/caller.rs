//! Caller identity extractor.
//!
//! Authentication happens upstream; the gateway in front of this service
//! forwards the verified user id in `X-User-Id`.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::request::Parts;
use http::StatusCode;

use crate::domain::foundation::UserId;

use super::error::ErrorResponse;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// The user making the request.
#[derive(Debug, Clone)]
pub struct Caller(pub UserId);

/// Rejection when `X-User-Id` is missing or empty.
pub struct CallerRequired;

impl IntoResponse for CallerRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = CallerRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s.trim()).ok())
            .map(Caller)
            .ok_or(CallerRequired)
    }
}
