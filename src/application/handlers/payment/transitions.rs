//! PaymentTransitions - the single write path for payment records.
//!
//! Confirm, Refund and the webhook reconciler all hand their transition to
//! [`PaymentTransitions::apply`]. It applies the transition to the latest
//! stored version of the record under compare-and-set and runs the side
//! effects (enrollment, notifications) exactly for the write that changed
//! the record.

use std::sync::Arc;

use crate::application::handlers::enrollment::{EnrollCommand, EnrollmentManager};
use crate::application::Notifier;
use crate::domain::enrollment::{Enrollment, EnrollmentError};
use crate::domain::foundation::ErrorCode;
use crate::domain::payment::{
    PaymentError, PaymentRecord, PaymentStatus, PaymentTransition, TransitionOutcome,
};
use crate::ports::{Notification, NotificationKind, PaymentRecordRepository, UpdateResult};

/// Result of applying a transition.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    /// Record as stored after the call.
    pub record: PaymentRecord,

    pub outcome: TransitionOutcome,

    /// Enrollment for the pair when the record is SUCCEEDED.
    pub enrollment: Option<Enrollment>,
}

pub struct PaymentTransitions {
    payments: Arc<dyn PaymentRecordRepository>,
    enrollments: Arc<EnrollmentManager>,
    notifier: Notifier,
    max_conflict_retries: u32,
}

impl PaymentTransitions {
    pub fn new(
        payments: Arc<dyn PaymentRecordRepository>,
        enrollments: Arc<EnrollmentManager>,
        notifier: Notifier,
        max_conflict_retries: u32,
    ) -> Self {
        Self {
            payments,
            enrollments,
            notifier,
            max_conflict_retries,
        }
    }

    /// Applies `transition` to `record`, reloading on version conflicts.
    ///
    /// # Errors
    ///
    /// - `DuplicatePurchase` when the pair already has another SUCCEEDED record
    /// - refund validation errors from [`PaymentRecord::apply`]
    /// - `Infrastructure` when the store fails, conflicts persist, or
    ///   enrollment after a capture could not be written
    pub async fn apply(
        &self,
        record: PaymentRecord,
        transition: &PaymentTransition,
    ) -> Result<AppliedTransition, PaymentError> {
        let mut current = record;

        for attempt in 0..=self.max_conflict_retries {
            let mut next = current.clone();
            let outcome = next.apply(transition)?;

            if !outcome.is_applied() {
                tracing::debug!(
                    payment_id = %next.id,
                    intent_id = %next.intent_id,
                    transition = transition.name(),
                    outcome = ?outcome,
                    "Transition already reflected, no write"
                );
                let enrollment = self.repair_enrollment(&next, transition).await?;
                return Ok(AppliedTransition {
                    record: next,
                    outcome,
                    enrollment,
                });
            }

            match self.payments.update(&next).await {
                Ok(UpdateResult::Updated) => {
                    next.version += 1;
                    tracing::info!(
                        payment_id = %next.id,
                        intent_id = %next.intent_id,
                        from = %current.status,
                        to = %next.status,
                        transition = transition.name(),
                        "Payment transition applied"
                    );
                    let enrollment = self.after_applied(&next, transition).await?;
                    return Ok(AppliedTransition {
                        record: next,
                        outcome,
                        enrollment,
                    });
                }
                Ok(UpdateResult::VersionConflict) => {
                    tracing::debug!(
                        payment_id = %current.id,
                        attempt,
                        "Payment version conflict, reloading"
                    );
                    current = self
                        .payments
                        .find_by_id(&current.id)
                        .await?
                        .ok_or(PaymentError::NotFound(current.id))?;
                }
                Err(e) if e.code == ErrorCode::DuplicatePurchase => {
                    tracing::error!(
                        payment_id = %next.id,
                        intent_id = %next.intent_id,
                        user_id = %next.user_id,
                        course_id = %next.course_id,
                        "Second capture for an already purchased course, needs manual refund"
                    );
                    return Err(PaymentError::DuplicatePurchase {
                        payment_id: next.id,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PaymentError::infrastructure(format!(
            "Payment {} kept changing; gave up after {} conflicts",
            current.id,
            self.max_conflict_retries + 1
        )))
    }

    async fn after_applied(
        &self,
        record: &PaymentRecord,
        transition: &PaymentTransition,
    ) -> Result<Option<Enrollment>, PaymentError> {
        match transition {
            PaymentTransition::Succeed { .. } => {
                self.notifier
                    .send(Notification::new(
                        record.user_id.clone(),
                        NotificationKind::PaymentSucceeded,
                        serde_json::json!({
                            "payment_id": record.id,
                            "course_id": record.course_id,
                            "amount": record.amount.amount(),
                            "currency": record.amount.currency(),
                        }),
                    ))
                    .await;
                self.enroll(record).await.map(Some)
            }
            PaymentTransition::Refund {
                refund_id, amount, ..
            } => {
                self.notifier
                    .send(Notification::new(
                        record.user_id.clone(),
                        NotificationKind::PaymentRefunded,
                        serde_json::json!({
                            "payment_id": record.id,
                            "refund_id": refund_id,
                            "amount": amount,
                            "refunded_amount": record.refunded_amount,
                            "fully_refunded": record.status == PaymentStatus::Refunded,
                        }),
                    ))
                    .await;
                Ok(None)
            }
            PaymentTransition::Fail { .. } | PaymentTransition::Cancel { .. } => Ok(None),
        }
    }

    /// A redelivered success on a SUCCEEDED record re-runs the idempotent
    /// enroll, so a crash between capture and enrollment heals itself.
    async fn repair_enrollment(
        &self,
        record: &PaymentRecord,
        transition: &PaymentTransition,
    ) -> Result<Option<Enrollment>, PaymentError> {
        match transition {
            PaymentTransition::Succeed { .. } if record.status == PaymentStatus::Succeeded => {
                self.enroll(record).await.map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn enroll(&self, record: &PaymentRecord) -> Result<Enrollment, PaymentError> {
        let result = self
            .enrollments
            .enroll(EnrollCommand {
                user_id: record.user_id.clone(),
                course_id: record.course_id,
            })
            .await
            .map_err(|e| enrollment_failure(record, e))?;
        Ok(result.enrollment)
    }
}

fn enrollment_failure(record: &PaymentRecord, err: EnrollmentError) -> PaymentError {
    tracing::error!(
        payment_id = %record.id,
        user_id = %record.user_id,
        course_id = %record.course_id,
        error = %err,
        "Payment captured but enrollment failed"
    );
    PaymentError::infrastructure(format!(
        "Enrollment after payment {} failed: {}",
        record.id, err
    ))
}
