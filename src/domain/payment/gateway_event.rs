//! Gateway-agnostic webhook events.
//!
//! The transport adapter verifies and parses the raw delivery; this is
//! what reaches the reconciler.

use crate::domain::foundation::{IntentId, Timestamp};
use serde::{Deserialize, Serialize};

use super::PaymentTransition;

/// One refund as listed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub refund_id: String,
    pub amount: i64,
    pub reason: Option<String>,
}

/// What the gateway says happened to an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayEventKind {
    /// `payment_intent.succeeded`
    Succeeded { payment_method: Option<String> },

    /// `payment_intent.payment_failed`
    PaymentFailed { reason: String },

    /// `payment_intent.canceled`
    Canceled { reason: Option<String> },

    /// `payment_intent.requires_action`: customer must authenticate.
    RequiresAction,

    /// `payment_intent.processing`: settlement pending at the gateway.
    Processing,

    /// `charge.refunded`: every refund the gateway holds for the intent.
    ///
    /// `reversed` lists refund ids the gateway reports as failed or canceled.
    ChargeRefunded {
        refunds: Vec<GatewayRefund>,
        #[serde(default)]
        reversed: Vec<String>,
    },

    /// Any other event type, kept by name for the log.
    Unhandled { event_type: String },
}

impl GatewayEventKind {
    /// Transitions this event asks for, in order. Empty for informational events.
    pub fn transitions(&self) -> Vec<PaymentTransition> {
        match self {
            GatewayEventKind::Succeeded { payment_method } => vec![PaymentTransition::Succeed {
                payment_method: payment_method.clone(),
            }],
            GatewayEventKind::PaymentFailed { reason } => vec![PaymentTransition::Fail {
                reason: reason.clone(),
            }],
            GatewayEventKind::Canceled { reason } => vec![PaymentTransition::Cancel {
                reason: reason.clone(),
            }],
            GatewayEventKind::ChargeRefunded { refunds, .. } => refunds
                .iter()
                .map(|r| PaymentTransition::Refund {
                    refund_id: r.refund_id.clone(),
                    amount: r.amount,
                    reason: r.reason.clone(),
                })
                .collect(),
            GatewayEventKind::RequiresAction
            | GatewayEventKind::Processing
            | GatewayEventKind::Unhandled { .. } => Vec::new(),
        }
    }

    /// Refund ids the gateway gave up on after accepting them.
    pub fn reversed_refunds(&self) -> &[String] {
        match self {
            GatewayEventKind::ChargeRefunded { reversed, .. } => reversed,
            _ => &[],
        }
    }

    /// Name for logs and the event log table.
    pub fn name(&self) -> &str {
        match self {
            GatewayEventKind::Succeeded { .. } => "payment_intent.succeeded",
            GatewayEventKind::PaymentFailed { .. } => "payment_intent.payment_failed",
            GatewayEventKind::Canceled { .. } => "payment_intent.canceled",
            GatewayEventKind::RequiresAction => "payment_intent.requires_action",
            GatewayEventKind::Processing => "payment_intent.processing",
            GatewayEventKind::ChargeRefunded { .. } => "charge.refunded",
            GatewayEventKind::Unhandled { event_type } => event_type,
        }
    }
}

/// A verified webhook delivery about one payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Gateway's event id (`evt_...`). Redeliveries reuse it.
    pub event_id: String,

    pub intent_id: IntentId,

    pub kind: GatewayEventKind,

    /// Raw event object, kept for the dead-letter log.
    pub payload: serde_json::Value,

    pub created_at: Timestamp,
}
