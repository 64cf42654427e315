//! Payment gateway port.
//!
//! The external PSP is consumed as an opaque service through three calls:
//! create an intent, confirm it with a payment method, refund it.
//!
//! # Design
//!
//! - **Gateway agnostic**: Stripe is one implementation
//! - **Idempotent**: every request carries an idempotency key so retries
//!   never duplicate a charge or a refund
//! - **Fallible**: callers bound every call with a timeout and treat
//!   `Unavailable` as retryable

use crate::domain::foundation::{IntentId, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Port for the payment service provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a remote payment intent.
    async fn create_intent(&self, request: CreateIntentRequest) -> Result<GatewayIntent, GatewayError>;

    /// Confirm an intent with a payment method.
    ///
    /// A decline is reported either as `IntentStatus::Failed` or as a
    /// `GatewayErrorCode::Declined` error, depending on the provider.
    async fn confirm_intent(&self, request: ConfirmIntentRequest) -> Result<ConfirmResult, GatewayError>;

    /// Refund part or all of a captured intent.
    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError>;
}

/// Request to create a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntentRequest {
    pub amount: Money,
    pub description: String,

    /// Tags echoed back in webhooks (`user_id`, `course_id`, ...).
    pub metadata: BTreeMap<String, String>,

    pub idempotency_key: String,
}

/// A payment intent as created by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayIntent {
    pub intent_id: IntentId,

    /// Secret the browser uses to finish payment. Never logged.
    pub client_secret: String,

    pub status: IntentStatus,
}

/// Request to confirm an intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmIntentRequest {
    pub intent_id: IntentId,

    /// Gateway reference to the payment method (`pm_...`).
    pub payment_method: String,

    pub idempotency_key: String,
}

/// Gateway-side status of an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntentStatus {
    Succeeded,

    /// Customer must complete an extra step (3-D Secure).
    RequiresAction,

    /// Settlement is pending at the gateway; a webhook will follow.
    Processing,

    /// Waiting for a payment method, not yet confirmed.
    RequiresPaymentMethod,

    Failed { reason: String },

    Canceled { reason: Option<String> },
}

/// Result of confirming an intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResult {
    pub status: IntentStatus,

    /// Payment method the gateway charged, when it reports one.
    pub payment_method: Option<String>,
}

/// Request to refund a captured intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub intent_id: IntentId,

    /// Amount in minor units.
    pub amount: i64,

    pub reason: Option<String>,
    pub idempotency_key: String,
}

/// Gateway-side status of a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefundStatus {
    Succeeded,

    /// Accepted, funds still moving. Recorded as done; a later failure is
    /// reported through `charge.refunded`.
    Pending,

    Failed { reason: String },

    Canceled,
}

impl RefundStatus {
    /// True when the gateway has committed to returning the money.
    pub fn is_accepted(&self) -> bool {
        matches!(self, RefundStatus::Succeeded | RefundStatus::Pending)
    }
}

/// Result of a refund request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    pub refund_id: String,
    pub status: RefundStatus,
}

/// Errors from gateway calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,

    /// Provider's own error or decline code, if any.
    pub provider_code: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Network failure, timeout, 5xx or rate limit.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Unavailable, message)
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Declined, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidRequest, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code == GatewayErrorCode::Unavailable
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Timeout, connection failure, 5xx, or 429.
    Unavailable,

    /// Card or payment method declined.
    Declined,

    /// Request rejected as malformed or not allowed in the current state.
    InvalidRequest,

    /// API key rejected.
    Authentication,
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Unavailable => "unavailable",
            GatewayErrorCode::Declined => "declined",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::Authentication => "authentication",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(GatewayError::unavailable("timeout").is_retryable());
        assert!(!GatewayError::declined("card_declined").is_retryable());
        assert!(!GatewayError::invalid_request("bad amount").is_retryable());
    }

    #[test]
    fn display_includes_code() {
        let err = GatewayError::declined("Your card was declined").with_provider_code("card_declined");
        assert_eq!(err.to_string(), "declined: Your card was declined");
        assert_eq!(err.provider_code.as_deref(), Some("card_declined"));
    }

    #[test]
    fn pending_refund_counts_as_accepted() {
        assert!(RefundStatus::Pending.is_accepted());
        assert!(RefundStatus::Succeeded.is_accepted());
        assert!(!RefundStatus::Canceled.is_accepted());
        assert!(!RefundStatus::Failed {
            reason: "expired_card".into()
        }
        .is_accepted());
    }
}
