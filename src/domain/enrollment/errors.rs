//! Enrollment-specific error types.

use crate::domain::foundation::{CourseId, DomainError, EnrollmentId, ErrorCode, UserId, ValidationError};
use thiserror::Error;

/// Enrollment-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentError {
    #[error("Enrollment not found: {0}")]
    NotFound(EnrollmentId),

    #[error("Course not found: {0}")]
    CourseNotFound(CourseId),

    /// Free course that is not open for enrollment.
    #[error("Course {course_id} is not open for enrollment: {reason}")]
    CourseNotOpen { course_id: CourseId, reason: String },

    /// Paid course without a succeeded payment for the pair.
    #[error("User {user_id} has not paid for course {course_id}")]
    PaymentRequired { user_id: UserId, course_id: CourseId },

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl EnrollmentError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EnrollmentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        EnrollmentError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EnrollmentError::NotFound(_) => ErrorCode::EnrollmentNotFound,
            EnrollmentError::CourseNotFound(_) => ErrorCode::CourseNotFound,
            EnrollmentError::CourseNotOpen { .. } => ErrorCode::InvalidCourseState,
            EnrollmentError::PaymentRequired { .. } => ErrorCode::PaymentRequired,
            EnrollmentError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            EnrollmentError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EnrollmentError::Infrastructure(_))
    }
}

impl From<DomainError> for EnrollmentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => EnrollmentError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => EnrollmentError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for EnrollmentError {
    fn from(err: ValidationError) -> Self {
        EnrollmentError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<EnrollmentError> for DomainError {
    fn from(err: EnrollmentError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_required_maps_to_code() {
        let err = EnrollmentError::PaymentRequired {
            user_id: UserId::new("u1").unwrap(),
            course_id: CourseId::new(),
        };
        assert_eq!(err.code(), ErrorCode::PaymentRequired);
        assert!(!err.is_retryable());
    }

    #[test]
    fn out_of_range_percentage_becomes_validation() {
        let err: EnrollmentError = ValidationError::out_of_range("percentage", 0, 100, 120).into();
        assert!(matches!(
            err,
            EnrollmentError::ValidationFailed { ref field, .. } if field == "percentage"
        ));
    }

    #[test]
    fn database_failure_is_retryable() {
        let err: EnrollmentError = DomainError::database("deadlock").into();
        assert!(err.is_retryable());
    }
}
