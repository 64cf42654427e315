//! Stripe webhook verification and event mapping.
//!
//! Verifies the `Stripe-Signature` header and turns the Stripe event
//! envelope into a gateway-agnostic [`GatewayEvent`].
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation against a configurable window for replay protection
//! - Secret held as `secrecy::SecretString`

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::domain::foundation::{IntentId, Timestamp};
use crate::domain::payment::{GatewayEvent, GatewayEventKind, GatewayRefund};

use super::gateway::StripePaymentIntent;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age for webhook events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Why a delivery was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Invalid signature header: {0}")]
    MalformedHeader(#[from] SignatureParseError),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Event too old ({0} seconds)")]
    TooOld(i64),

    #[error("Event timestamp in future")]
    FromFuture,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Test mode events not allowed")]
    TestModeRejected,
}

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureParseError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,
    #[error("Missing timestamp (t=) in signature")]
    MissingTimestamp,
    #[error("Missing v1 signature in header")]
    MissingV1Signature,
    #[error("Invalid timestamp format")]
    InvalidTimestamp,
    #[error("Invalid signature format (not valid hex)")]
    InvalidSignatureFormat,
}

/// Parsed `t=<timestamp>,v1=<signature>[,v1=...]` header.
///
/// Stripe sends several `v1` entries while a secret is being rolled; any
/// one of them may match.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => v1_signatures.push(
                    hex_decode(value.trim()).ok_or(SignatureParseError::InvalidSignatureFormat)?,
                ),
                // v0 and unknown schemes are ignored
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }
        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Computes the `v1` signature Stripe would send for `payload` at `timestamp`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Event Envelope
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize, Serialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
    #[serde(default)]
    livemode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct StripeCharge {
    payment_intent: Option<String>,
    #[serde(default)]
    refunds: Option<StripeList<StripeChargeRefund>>,
}

#[derive(Debug, Clone, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct StripeChargeRefund {
    id: String,
    amount: i64,
    status: Option<String>,
    reason: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Verifier
// ════════════════════════════════════════════════════════════════════════════════

/// Verifies Stripe deliveries and maps them to [`GatewayEvent`]s.
#[derive(Clone)]
pub struct StripeWebhookVerifier {
    webhook_secret: SecretString,
    tolerance_secs: i64,
    require_livemode: bool,
}

impl StripeWebhookVerifier {
    pub fn new(webhook_secret: SecretString) -> Self {
        Self {
            webhook_secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            require_livemode: false,
        }
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    /// Verifies the signature and parses the event.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, WebhookError> {
        // 1. Parse signature header
        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            WebhookError::from(e)
        })?;

        // 2. Verify signature (includes timestamp validation)
        self.verify_signature(payload, &header, chrono::Utc::now().timestamp())?;

        // 3. Parse and convert event
        let event = self.parse_event(payload)?;

        tracing::info!(
            event_id = %event.event_id,
            event_type = event.kind.name(),
            intent_id = %event.intent_id,
            "Webhook signature verified"
        );
        Ok(event)
    }

    fn verify_signature(&self, payload: &[u8], header: &SignatureHeader, now: i64) -> Result<(), WebhookError> {
        let age = now - header.timestamp;
        if age > self.tolerance_secs {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(WebhookError::TooOld(age));
        }
        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(WebhookError::FromFuture);
        }

        let expected = compute_signature(
            self.webhook_secret.expose_secret(),
            header.timestamp,
            payload,
        );
        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| expected.as_slice().ct_eq(provided.as_slice()).unwrap_u8() == 1);

        if !matched {
            tracing::warn!("Invalid webhook signature");
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn parse_event(&self, payload: &[u8]) -> Result<GatewayEvent, WebhookError> {
        let stripe_event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            WebhookError::InvalidPayload(format!("Invalid JSON: {}", e))
        })?;

        if self.require_livemode && !stripe_event.livemode {
            tracing::warn!(event_id = %stripe_event.id, "Rejected test mode event");
            return Err(WebhookError::TestModeRejected);
        }

        let object = &stripe_event.data.object;
        let (intent_id, kind) = match stripe_event.event_type.as_str() {
            "payment_intent.succeeded"
            | "payment_intent.payment_failed"
            | "payment_intent.canceled"
            | "payment_intent.requires_action"
            | "payment_intent.processing" => {
                let intent: StripePaymentIntent = serde_json::from_value(object.clone())
                    .map_err(|e| WebhookError::InvalidPayload(format!("Invalid payment intent: {}", e)))?;
                let kind = payment_intent_kind(&stripe_event.event_type, &intent);
                (intent.id, kind)
            }
            "charge.refunded" => {
                let charge: StripeCharge = serde_json::from_value(object.clone())
                    .map_err(|e| WebhookError::InvalidPayload(format!("Invalid charge: {}", e)))?;
                let intent_id = charge.payment_intent.ok_or_else(|| {
                    WebhookError::InvalidPayload("Charge has no payment_intent".to_string())
                })?;
                let mut refunds = Vec::new();
                let mut reversed = Vec::new();
                for r in charge.refunds.map(|list| list.data).unwrap_or_default() {
                    match r.status.as_deref() {
                        None | Some("succeeded") | Some("pending") | Some("requires_action") => {
                            refunds.push(GatewayRefund {
                                refund_id: r.id,
                                amount: r.amount,
                                reason: r.reason,
                            })
                        }
                        Some("failed") | Some("canceled") => reversed.push(r.id),
                        Some(other) => {
                            tracing::debug!(refund_id = %r.id, status = other, "Skipping refund in unknown state")
                        }
                    }
                }
                (intent_id, GatewayEventKind::ChargeRefunded { refunds, reversed })
            }
            other => {
                let intent_id = object
                    .get("payment_intent")
                    .and_then(|v| v.as_str())
                    .or_else(|| object.get("id").and_then(|v| v.as_str()))
                    .unwrap_or("unknown")
                    .to_string();
                (
                    intent_id,
                    GatewayEventKind::Unhandled {
                        event_type: other.to_string(),
                    },
                )
            }
        };

        let intent_id = IntentId::new(intent_id)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
        let payload_value = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        Ok(GatewayEvent {
            event_id: stripe_event.id,
            intent_id,
            kind,
            payload: payload_value,
            created_at: Timestamp::from_unix_secs(stripe_event.created).unwrap_or_else(Timestamp::now),
        })
    }
}

fn payment_intent_kind(event_type: &str, intent: &StripePaymentIntent) -> GatewayEventKind {
    match event_type {
        "payment_intent.succeeded" => GatewayEventKind::Succeeded {
            payment_method: intent.payment_method.clone(),
        },
        "payment_intent.payment_failed" => GatewayEventKind::PaymentFailed {
            reason: intent
                .last_payment_error
                .as_ref()
                .map(|e| e.reason())
                .unwrap_or_else(|| "payment failed".to_string()),
        },
        "payment_intent.canceled" => GatewayEventKind::Canceled {
            reason: intent.cancellation_reason.clone(),
        },
        "payment_intent.requires_action" => GatewayEventKind::RequiresAction,
        _ => GatewayEventKind::Processing,
    }
}
