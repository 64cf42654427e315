//! Payment-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound / IntentNotFound / CourseNotFound | 404 |
//! | ValidationFailed | 400 |
//! | InvalidCourseState | 422 |
//! | AlreadyPurchased / AlreadyEnrolled / DuplicatePurchase | 409 |
//! | CapturedAfterSettlement | 409 |
//! | NotPending / NotRefundable | 409 |
//! | RefundExceedsBalance | 422 |
//! | Declined | 402 |
//! | GatewayRejected | 502 |
//! | GatewayUnavailable | 503 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{
    CourseId, DomainError, ErrorCode, IntentId, PaymentId, UserId, ValidationError,
};

use super::PaymentStatus;

/// Payment-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// No payment record with this id.
    NotFound(PaymentId),

    /// No payment record carries this gateway intent id.
    IntentNotFound(IntentId),

    /// Course does not exist in the catalog.
    CourseNotFound(CourseId),

    /// Course exists but cannot be bought (unpublished or free).
    InvalidCourseState { course_id: CourseId, reason: String },

    /// The user already holds a succeeded payment for the course.
    AlreadyPurchased { user_id: UserId, course_id: CourseId },

    /// The user is already enrolled in the course.
    AlreadyEnrolled { user_id: UserId, course_id: CourseId },

    /// A second charge for the same (user, course) was captured and needs
    /// manual reconciliation.
    DuplicatePurchase { payment_id: PaymentId },

    /// The gateway captured a charge whose record had already settled as
    /// FAILED or CANCELED. The customer is charged without access and the
    /// charge needs manual reconciliation.
    CapturedAfterSettlement {
        payment_id: PaymentId,
        status: PaymentStatus,
    },

    /// Confirm was called on a record that already settled.
    NotPending {
        payment_id: PaymentId,
        status: PaymentStatus,
    },

    /// Refund was requested on a record that is not in SUCCEEDED.
    NotRefundable {
        payment_id: PaymentId,
        status: PaymentStatus,
    },

    /// Refund amount is larger than what remains refundable.
    RefundExceedsBalance { requested: i64, available: i64 },

    /// Gateway declined the charge. Terminal for this attempt.
    Declined { reason: String },

    /// Gateway refused a request for a reason other than a decline.
    GatewayRejected(String),

    /// Gateway timed out or answered with a server error.
    GatewayUnavailable(String),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl PaymentError {
    pub fn not_found(id: PaymentId) -> Self {
        PaymentError::NotFound(id)
    }

    pub fn intent_not_found(intent_id: IntentId) -> Self {
        PaymentError::IntentNotFound(intent_id)
    }

    pub fn invalid_course_state(course_id: CourseId, reason: impl Into<String>) -> Self {
        PaymentError::InvalidCourseState {
            course_id,
            reason: reason.into(),
        }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        PaymentError::Declined {
            reason: reason.into(),
        }
    }

    pub fn gateway_unavailable(message: impl Into<String>) -> Self {
        PaymentError::GatewayUnavailable(message.into())
    }

    pub fn gateway_rejected(message: impl Into<String>) -> Self {
        PaymentError::GatewayRejected(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::NotFound(_) | PaymentError::IntentNotFound(_) => {
                ErrorCode::PaymentNotFound
            }
            PaymentError::CourseNotFound(_) => ErrorCode::CourseNotFound,
            PaymentError::InvalidCourseState { .. } => ErrorCode::InvalidCourseState,
            PaymentError::AlreadyPurchased { .. } => ErrorCode::AlreadyPurchased,
            PaymentError::AlreadyEnrolled { .. } => ErrorCode::AlreadyEnrolled,
            PaymentError::DuplicatePurchase { .. } => ErrorCode::DuplicatePurchase,
            PaymentError::CapturedAfterSettlement { .. } => ErrorCode::CaptureOnSettledPayment,
            PaymentError::NotPending { .. } => ErrorCode::PaymentNotPending,
            PaymentError::NotRefundable { .. } => ErrorCode::PaymentNotRefundable,
            PaymentError::RefundExceedsBalance { .. } => ErrorCode::RefundExceedsBalance,
            PaymentError::Declined { .. } => ErrorCode::PaymentDeclined,
            PaymentError::GatewayRejected(_) => ErrorCode::GatewayRejected,
            PaymentError::GatewayUnavailable(_) => ErrorCode::GatewayUnavailable,
            PaymentError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PaymentError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            PaymentError::NotFound(id) => format!("Payment not found: {}", id),
            PaymentError::IntentNotFound(intent) => {
                format!("No payment found for intent: {}", intent)
            }
            PaymentError::CourseNotFound(id) => format!("Course not found: {}", id),
            PaymentError::InvalidCourseState { course_id, reason } => {
                format!("Course {} cannot be purchased: {}", course_id, reason)
            }
            PaymentError::AlreadyPurchased { user_id, course_id } => {
                format!("User {} has already paid for course {}", user_id, course_id)
            }
            PaymentError::AlreadyEnrolled { user_id, course_id } => {
                format!("User {} is already enrolled in course {}", user_id, course_id)
            }
            PaymentError::DuplicatePurchase { payment_id } => format!(
                "Payment {} duplicates an existing purchase and requires manual refund",
                payment_id
            ),
            PaymentError::CapturedAfterSettlement { payment_id, status } => format!(
                "Payment {} was captured by the gateway but is recorded as {}; requires manual reconciliation",
                payment_id, status
            ),
            PaymentError::NotPending { payment_id, status } => {
                format!("Payment {} is {} and can no longer be confirmed", payment_id, status)
            }
            PaymentError::NotRefundable { payment_id, status } => {
                format!("Payment {} is {} and cannot be refunded", payment_id, status)
            }
            PaymentError::RefundExceedsBalance {
                requested,
                available,
            } => format!(
                "Refund of {} exceeds refundable balance of {}",
                requested, available
            ),
            PaymentError::Declined { reason } => format!("Payment declined: {}", reason),
            PaymentError::GatewayRejected(msg) => format!("Payment gateway rejected request: {}", msg),
            PaymentError::GatewayUnavailable(msg) => {
                format!("Payment gateway unavailable: {}", msg)
            }
            PaymentError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PaymentError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::GatewayUnavailable(_) | PaymentError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PaymentError {}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => PaymentError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::GatewayUnavailable => PaymentError::GatewayUnavailable(err.message),
            _ => PaymentError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for PaymentError {
    fn from(err: ValidationError) -> Self {
        PaymentError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_exceeds_balance_reports_both_amounts() {
        let err = PaymentError::RefundExceedsBalance {
            requested: 1500,
            available: 1000,
        };
        assert_eq!(err.code(), ErrorCode::RefundExceedsBalance);
        assert_eq!(
            err.to_string(),
            "Refund of 1500 exceeds refundable balance of 1000"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn declined_is_terminal() {
        let err = PaymentError::declined("card_declined");
        assert_eq!(err.code(), ErrorCode::PaymentDeclined);
        assert!(!err.is_retryable());
    }

    #[test]
    fn gateway_unavailable_is_retryable() {
        let err = PaymentError::gateway_unavailable("timeout after 10s");
        assert!(err.is_retryable());
        assert_eq!(err.code(), ErrorCode::GatewayUnavailable);
    }

    #[test]
    fn not_pending_names_status() {
        let id = PaymentId::new();
        let err = PaymentError::NotPending {
            payment_id: id,
            status: PaymentStatus::Failed,
        };
        assert!(err.to_string().contains("failed"));
        assert_eq!(err.code(), ErrorCode::PaymentNotPending);
    }

    #[test]
    fn capture_after_settlement_is_a_conflict_not_a_retry() {
        let err = PaymentError::CapturedAfterSettlement {
            payment_id: PaymentId::new(),
            status: PaymentStatus::Canceled,
        };
        assert_eq!(err.code(), ErrorCode::CaptureOnSettledPayment);
        assert!(err.to_string().contains("canceled"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn domain_validation_keeps_field() {
        let err: PaymentError = DomainError::validation("amount", "must be positive").into();
        assert_eq!(
            err,
            PaymentError::ValidationFailed {
                field: "amount".to_string(),
                message: "must be positive".to_string(),
            }
        );
    }

    #[test]
    fn domain_database_error_becomes_infrastructure() {
        let err: PaymentError = DomainError::database("pool timed out").into();
        assert!(matches!(err, PaymentError::Infrastructure(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn converts_back_to_domain_error_with_code() {
        let err: DomainError = PaymentError::declined("insufficient_funds").into();
        assert_eq!(err.code, ErrorCode::PaymentDeclined);
    }
}
