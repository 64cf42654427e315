//! WebhookReconciler - converges payment and enrollment state from gateway events.
//!
//! Events arrive already verified. Every event is acknowledged: failures are
//! retried here with backoff and dead-lettered to the event log when they
//! run out, never surfaced to the gateway.

use std::sync::Arc;

use chrono::Utc;

use crate::application::retry::{retry_with_backoff, RetryPolicy};
use crate::domain::payment::{
    GatewayEvent, PaymentError, PaymentStatus, PaymentTransition, TransitionOutcome,
};
use crate::ports::{PaymentRecordRepository, WebhookEventEntry, WebhookEventLog, WebhookOutcome};

use crate::application::handlers::payment::PaymentTransitions;

/// How one event settled, before it is written to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Disposition {
    Applied,
    NoOp,
    Orphaned,

    /// Consistent state cannot be reached automatically.
    NeedsAttention(String),
}

pub struct WebhookReconciler {
    payments: Arc<dyn PaymentRecordRepository>,
    transitions: Arc<PaymentTransitions>,
    event_log: Arc<dyn WebhookEventLog>,
    retry_policy: RetryPolicy,
}

impl WebhookReconciler {
    pub fn new(
        payments: Arc<dyn PaymentRecordRepository>,
        transitions: Arc<PaymentTransitions>,
        event_log: Arc<dyn WebhookEventLog>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            payments,
            transitions,
            event_log,
            retry_policy,
        }
    }

    /// Handles one event. Never fails; the outcome is logged and returned.
    #[tracing::instrument(
        skip(self, event),
        fields(event_id = %event.event_id, intent_id = %event.intent_id, event_type = event.kind.name())
    )]
    pub async fn handle(&self, event: GatewayEvent) -> WebhookOutcome {
        let transitions = event.kind.transitions();

        let (outcome, attempts, error_message) = if transitions.is_empty()
            && event.kind.reversed_refunds().is_empty()
        {
            tracing::debug!("Event needs no transition, acknowledging");
            (WebhookOutcome::Ignored, 0, None)
        } else {
            match retry_with_backoff(
                &self.retry_policy,
                |e: &PaymentError| e.is_retryable(),
                || self.reconcile(&event, &transitions),
            )
            .await
            {
                Ok((Disposition::Applied, attempts)) => (WebhookOutcome::Applied, attempts, None),
                Ok((Disposition::NoOp, attempts)) => (WebhookOutcome::NoOp, attempts, None),
                Ok((Disposition::Orphaned, attempts)) => {
                    tracing::warn!("No payment record for intent, dropping event");
                    (WebhookOutcome::Orphaned, attempts, None)
                }
                Ok((Disposition::NeedsAttention(reason), attempts)) => {
                    tracing::error!(reason = %reason, "Event needs manual attention, dead-lettering");
                    (WebhookOutcome::DeadLettered, attempts, Some(reason))
                }
                Err(failure) => {
                    tracing::error!(
                        attempts = failure.attempts,
                        error = %failure.error,
                        "Event could not be applied, dead-lettering"
                    );
                    (
                        WebhookOutcome::DeadLettered,
                        failure.attempts,
                        Some(failure.error.to_string()),
                    )
                }
            }
        };

        let entry = WebhookEventEntry {
            event_id: event.event_id.clone(),
            event_type: event.kind.name().to_string(),
            intent_id: event.intent_id.to_string(),
            outcome,
            attempts,
            error_message,
            payload: event.payload,
            recorded_at: Utc::now(),
        };
        if let Err(e) = self.event_log.record(entry).await {
            tracing::warn!(error = %e, "Failed to record webhook event");
        }

        tracing::info!(outcome = %outcome, attempts, "Webhook event handled");
        outcome
    }

    /// One attempt: reload the record and run every transition of the event
    /// through the shared transition path.
    async fn reconcile(
        &self,
        event: &GatewayEvent,
        transitions: &[PaymentTransition],
    ) -> Result<Disposition, PaymentError> {
        let Some(mut record) = self.payments.find_by_intent_id(&event.intent_id).await? else {
            return Ok(Disposition::Orphaned);
        };

        let mut changed = false;
        for transition in transitions {
            let applied = match self.transitions.apply(record, transition).await {
                Ok(applied) => applied,
                Err(PaymentError::DuplicatePurchase { payment_id }) => {
                    return Ok(Disposition::NeedsAttention(format!(
                        "payment {} captured for a course the user already owns",
                        payment_id
                    )));
                }
                Err(e) => return Err(e),
            };

            match (transition, applied.outcome) {
                (_, TransitionOutcome::Applied { .. }) => changed = true,
                (
                    PaymentTransition::Succeed { .. },
                    TransitionOutcome::Superseded { current },
                ) if matches!(current, PaymentStatus::Failed | PaymentStatus::Canceled) => {
                    return Ok(Disposition::NeedsAttention(format!(
                        "gateway captured payment {} but it is recorded as {}",
                        applied.record.id, current
                    )));
                }
                (_, TransitionOutcome::Superseded { current }) => {
                    tracing::debug!(
                        payment_id = %applied.record.id,
                        transition = transition.name(),
                        current = %current,
                        "Event superseded by an earlier settlement"
                    );
                }
                (_, TransitionOutcome::AlreadyApplied) => {}
            }
            record = applied.record;
        }

        // Refunds are recorded once the gateway accepts them, pending included.
        // One that later fails leaves the ledger ahead of the money.
        if let Some(refund_id) = event
            .kind
            .reversed_refunds()
            .iter()
            .find(|id| record.has_refund(id))
        {
            return Ok(Disposition::NeedsAttention(format!(
                "refund {} recorded on payment {} was reported failed by the gateway",
                refund_id, record.id
            )));
        }

        Ok(if changed {
            Disposition::Applied
        } else {
            Disposition::NoOp
        })
    }
}
