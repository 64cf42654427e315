//! API error type that converts domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::enrollment::EnrollmentError;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::PaymentError;

/// Standard error response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.code)
    }
}

/// HTTP status for each error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorCode::PaymentNotFound | ErrorCode::EnrollmentNotFound | ErrorCode::CourseNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::InvalidCourseState | ErrorCode::RefundExceedsBalance => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCode::AlreadyPurchased
        | ErrorCode::AlreadyEnrolled
        | ErrorCode::DuplicatePurchase
        | ErrorCode::CaptureOnSettledPayment
        | ErrorCode::PaymentNotPending
        | ErrorCode::PaymentNotRefundable
        | ErrorCode::InvalidStateTransition
        | ErrorCode::ConcurrencyConflict => StatusCode::CONFLICT,
        ErrorCode::PaymentRequired | ErrorCode::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
        ErrorCode::GatewayRejected => StatusCode::BAD_GATEWAY,
        ErrorCode::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::DatabaseError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self::new(err.code(), err.message())
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::new(err.code, err.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "Request failed");
        }

        // Internal details stay in the log.
        let message = match self.code {
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                "An internal error occurred".to_string()
            }
            _ => self.message,
        };
        let body = ErrorResponse::new(self.code.to_string(), message);
        (status, Json(body)).into_response()
    }
}
