//! WebhookEventLog port - audit trail and dead-letter store for gateway events.
//!
//! Every delivery the reconciler handles is recorded with its outcome.
//! Redeliveries of the same event id overwrite the previous entry, so the
//! log holds the latest outcome per event. Entries with outcome
//! `DeadLettered` are the manual replay queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::DomainError;

/// How the reconciler disposed of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Changed a payment record.
    Applied,

    /// Record already reflected the event.
    NoOp,

    /// Event type needs no transition.
    Ignored,

    /// No local record for the intent.
    Orphaned,

    /// Could not be applied after retries, or needs manual attention.
    DeadLettered,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied => "applied",
            WebhookOutcome::NoOp => "no_op",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::Orphaned => "orphaned",
            WebhookOutcome::DeadLettered => "dead_lettered",
        }
    }
}

impl fmt::Display for WebhookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(WebhookOutcome::Applied),
            "no_op" => Ok(WebhookOutcome::NoOp),
            "ignored" => Ok(WebhookOutcome::Ignored),
            "orphaned" => Ok(WebhookOutcome::Orphaned),
            "dead_lettered" => Ok(WebhookOutcome::DeadLettered),
            other => Err(format!("unknown webhook outcome '{}'", other)),
        }
    }
}

/// Record of one handled webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventEntry {
    /// Gateway event ID (evt_xxx format).
    pub event_id: String,

    pub event_type: String,
    pub intent_id: String,
    pub outcome: WebhookOutcome,

    /// Attempts made, including the first.
    pub attempts: u32,

    /// Last error, for dead-lettered events.
    pub error_message: Option<String>,

    /// Original event payload for replay.
    pub payload: serde_json::Value,

    pub recorded_at: DateTime<Utc>,
}

/// Port for the webhook audit log and dead-letter queue.
#[async_trait]
pub trait WebhookEventLog: Send + Sync {
    /// Insert or replace the entry for `entry.event_id`.
    async fn record(&self, entry: WebhookEventEntry) -> Result<(), DomainError>;

    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEventEntry>, DomainError>;

    /// Dead-lettered entries, oldest first.
    async fn list_dead_letters(&self, limit: u32) -> Result<Vec<WebhookEventEntry>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_round_trips_through_str() {
        for outcome in [
            WebhookOutcome::Applied,
            WebhookOutcome::NoOp,
            WebhookOutcome::Ignored,
            WebhookOutcome::Orphaned,
            WebhookOutcome::DeadLettered,
        ] {
            assert_eq!(outcome.as_str().parse::<WebhookOutcome>().unwrap(), outcome);
        }
    }
}
