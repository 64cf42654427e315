//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port over Stripe PaymentIntents and
//! Refunds, and verifies inbound webhook deliveries.
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks
//! - All secrets are handled via `secrecy::SecretString`

mod gateway;
mod mock_gateway;
mod webhook;

pub use gateway::{StripeConfig, StripeGateway};
pub use mock_gateway::MockPaymentGateway;
pub use webhook::{
    compute_signature, hex_encode, SignatureHeader, SignatureParseError, StripeWebhookVerifier,
    WebhookError, DEFAULT_TOLERANCE_SECS,
};
