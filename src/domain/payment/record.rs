//! PaymentRecord aggregate.
//!
//! One record per payment attempt. Records are never deleted; failed and
//! canceled attempts stay as audit trail.
//!
//! # Design Decisions
//!
//! - **Money in minor units**: `amount` and `refunded_amount` are i64 cents
//! - **Single mutation path**: every status change goes through [`PaymentRecord::apply`]
//! - **Optimistic concurrency**: `version` is compared-and-set by the store

use crate::domain::foundation::{
    CourseId, IntentId, Money, PaymentId, StateMachine, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::{PaymentError, PaymentStatus};

/// A requested change to a payment record.
///
/// Both the synchronous confirm path and the webhook path express what the
/// gateway told them as one of these and hand it to [`PaymentRecord::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTransition {
    /// Gateway captured the charge.
    Succeed { payment_method: Option<String> },

    /// Gateway declined or failed the charge.
    Fail { reason: String },

    /// Intent was canceled before capture.
    Cancel { reason: Option<String> },

    /// The gateway accepted refund `refund_id` of `amount` minor units.
    ///
    /// Keyed by refund id, so the synchronous refund path and the
    /// `charge.refunded` webhook can both report the same refund.
    Refund {
        refund_id: String,
        amount: i64,
        reason: Option<String>,
    },
}

impl PaymentTransition {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            PaymentTransition::Succeed { .. } => "succeed",
            PaymentTransition::Fail { .. } => "fail",
            PaymentTransition::Cancel { .. } => "cancel",
            PaymentTransition::Refund { .. } => "refund",
        }
    }
}

/// What [`PaymentRecord::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The record changed. `from` is the status before the change.
    Applied { from: PaymentStatus },

    /// The record was already in the requested state; nothing changed.
    AlreadyApplied,

    /// The record settled differently before this transition arrived;
    /// nothing changed. `current` is the status that won.
    Superseded { current: PaymentStatus },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

/// A refund the gateway accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundEntry {
    /// Gateway refund id (`re_...`).
    pub refund_id: String,
    pub amount: i64,
    pub reason: Option<String>,
    pub refunded_at: Timestamp,
}

/// PaymentRecord aggregate.
///
/// # Invariants
///
/// - `intent_id` is unique and never changes
/// - `refunded_amount` is the sum of `refunds` and never exceeds `amount`
/// - refund ids in `refunds` are unique
/// - `status == Refunded` iff `refunded_amount == amount` on a captured payment
/// - `paid_at` is set iff the payment was captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub intent_id: IntentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub amount: Money,
    pub status: PaymentStatus,

    /// Sum of all accepted refunds, in minor units.
    pub refunded_amount: i64,

    /// Reason given for the latest refund.
    pub refund_reason: Option<String>,

    pub refunds: Vec<RefundEntry>,

    /// Gateway reference of the payment method used to pay (`pm_...`).
    pub payment_method: Option<String>,

    /// Gateway's reason for a failure or cancellation.
    pub failure_reason: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub refunded_at: Option<Timestamp>,

    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: i64,
}

impl PaymentRecord {
    /// Creates a pending record for an intent the gateway already created.
    pub fn new_pending(
        id: PaymentId,
        intent_id: IntentId,
        user_id: UserId,
        course_id: CourseId,
        amount: Money,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            intent_id,
            user_id,
            course_id,
            amount,
            status: PaymentStatus::Pending,
            refunded_amount: 0,
            refund_reason: None,
            refunds: Vec::new(),
            payment_method: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
            refunded_at: None,
            version: 0,
        }
    }

    /// Amount kept after refunds.
    pub fn net_amount(&self) -> i64 {
        self.amount.amount() - self.refunded_amount
    }

    /// Amount that can still be refunded.
    pub fn refundable_amount(&self) -> i64 {
        match self.status {
            PaymentStatus::Succeeded => self.net_amount(),
            _ => 0,
        }
    }

    pub fn is_partially_refunded(&self) -> bool {
        self.status == PaymentStatus::Succeeded && self.refunded_amount > 0
    }

    /// Applies a transition, idempotently.
    ///
    /// Re-applying a transition the record already reflects is
    /// `AlreadyApplied`, never an error. Only refund validation fails.
    pub fn apply(&mut self, transition: &PaymentTransition) -> Result<TransitionOutcome, PaymentError> {
        let from = self.status;
        match transition {
            PaymentTransition::Succeed { payment_method } => match from {
                PaymentStatus::Pending => {
                    self.move_to(PaymentStatus::Succeeded)?;
                    if payment_method.is_some() {
                        self.payment_method = payment_method.clone();
                    }
                    self.paid_at = Some(self.updated_at);
                    Ok(TransitionOutcome::Applied { from })
                }
                PaymentStatus::Succeeded | PaymentStatus::Refunded => {
                    Ok(TransitionOutcome::AlreadyApplied)
                }
                PaymentStatus::Failed | PaymentStatus::Canceled => {
                    Ok(TransitionOutcome::Superseded { current: from })
                }
            },

            PaymentTransition::Fail { reason } => match from {
                PaymentStatus::Pending => {
                    self.move_to(PaymentStatus::Failed)?;
                    self.failure_reason = Some(reason.clone());
                    Ok(TransitionOutcome::Applied { from })
                }
                PaymentStatus::Failed => Ok(TransitionOutcome::AlreadyApplied),
                current => Ok(TransitionOutcome::Superseded { current }),
            },

            PaymentTransition::Cancel { reason } => match from {
                PaymentStatus::Pending => {
                    self.move_to(PaymentStatus::Canceled)?;
                    self.failure_reason = reason.clone();
                    Ok(TransitionOutcome::Applied { from })
                }
                PaymentStatus::Canceled => Ok(TransitionOutcome::AlreadyApplied),
                current => Ok(TransitionOutcome::Superseded { current }),
            },

            PaymentTransition::Refund {
                refund_id,
                amount,
                reason,
            } => {
                if self.has_refund(refund_id) {
                    return Ok(TransitionOutcome::AlreadyApplied);
                }
                if from != PaymentStatus::Succeeded {
                    return Err(PaymentError::NotRefundable {
                        payment_id: self.id,
                        status: from,
                    });
                }
                if *amount <= 0 {
                    return Err(PaymentError::validation(
                        "amount",
                        "Refund amount must be greater than zero",
                    ));
                }
                let available = self.refundable_amount();
                if *amount > available {
                    return Err(PaymentError::RefundExceedsBalance {
                        requested: *amount,
                        available,
                    });
                }

                let now = Timestamp::now();
                self.refunds.push(RefundEntry {
                    refund_id: refund_id.clone(),
                    amount: *amount,
                    reason: reason.clone(),
                    refunded_at: now,
                });
                self.refunded_amount += amount;
                if reason.is_some() {
                    self.refund_reason = reason.clone();
                }
                self.refunded_at = Some(now);
                self.updated_at = now;
                if self.refunded_amount == self.amount.amount() {
                    self.move_to(PaymentStatus::Refunded)?;
                }
                Ok(TransitionOutcome::Applied { from })
            }
        }
    }

    /// True if the gateway refund with this id is already recorded.
    pub fn has_refund(&self, refund_id: &str) -> bool {
        self.refunds.iter().any(|r| r.refund_id == refund_id)
    }

    fn move_to(&mut self, target: PaymentStatus) -> Result<(), PaymentError> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;
    use proptest::prelude::*;

    fn pending(amount: i64) -> PaymentRecord {
        PaymentRecord::new_pending(
            PaymentId::new(),
            IntentId::new("pi_test").unwrap(),
            UserId::new("user-1").unwrap(),
            CourseId::new(),
            Money::new(amount, Currency::usd()).unwrap(),
        )
    }

    fn succeeded(amount: i64) -> PaymentRecord {
        let mut record = pending(amount);
        record
            .apply(&PaymentTransition::Succeed {
                payment_method: Some("pm_card".to_string()),
            })
            .unwrap();
        record
    }

    #[test]
    fn new_pending_starts_clean() {
        let record = pending(2000);
        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.refunded_amount, 0);
        assert_eq!(record.version, 0);
        assert!(record.paid_at.is_none());
    }

    #[test]
    fn succeed_from_pending_stamps_paid_at_and_method() {
        let record = succeeded(2000);
        assert_eq!(record.status, PaymentStatus::Succeeded);
        assert_eq!(record.payment_method.as_deref(), Some("pm_card"));
        assert!(record.paid_at.is_some());
    }

    #[test]
    fn second_succeed_is_already_applied_and_changes_nothing() {
        let mut record = succeeded(2000);
        let before = record.clone();
        let outcome = record
            .apply(&PaymentTransition::Succeed { payment_method: None })
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::AlreadyApplied);
        assert_eq!(record, before);
    }

    #[test]
    fn succeed_after_failure_is_superseded() {
        let mut record = pending(2000);
        record
            .apply(&PaymentTransition::Fail {
                reason: "card_declined".to_string(),
            })
            .unwrap();
        let outcome = record
            .apply(&PaymentTransition::Succeed { payment_method: None })
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Superseded {
                current: PaymentStatus::Failed
            }
        );
        assert_eq!(record.failure_reason.as_deref(), Some("card_declined"));
    }

    #[test]
    fn late_failure_does_not_override_success() {
        let mut record = succeeded(2000);
        let outcome = record
            .apply(&PaymentTransition::Fail {
                reason: "late".to_string(),
            })
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Superseded {
                current: PaymentStatus::Succeeded
            }
        );
        assert_eq!(record.status, PaymentStatus::Succeeded);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut record = pending(2000);
        assert!(record
            .apply(&PaymentTransition::Cancel { reason: None })
            .unwrap()
            .is_applied());
        assert_eq!(
            record
                .apply(&PaymentTransition::Cancel { reason: None })
                .unwrap(),
            TransitionOutcome::AlreadyApplied
        );
    }

    fn refund(id: &str, amount: i64) -> PaymentTransition {
        PaymentTransition::Refund {
            refund_id: id.to_string(),
            amount,
            reason: Some("requested_by_customer".to_string()),
        }
    }

    #[test]
    fn partial_refund_keeps_succeeded() {
        let mut record = succeeded(2000);
        record.apply(&refund("re_1", 1000)).unwrap();
        assert_eq!(record.status, PaymentStatus::Succeeded);
        assert_eq!(record.refunded_amount, 1000);
        assert_eq!(record.net_amount(), 1000);
        assert!(record.is_partially_refunded());
        assert!(record.refunded_at.is_some());
        assert_eq!(record.refund_reason.as_deref(), Some("requested_by_customer"));
    }

    #[test]
    fn full_refund_moves_to_refunded() {
        let mut record = succeeded(2000);
        record.apply(&refund("re_1", 2000)).unwrap();
        assert_eq!(record.status, PaymentStatus::Refunded);
        assert_eq!(record.refundable_amount(), 0);
    }

    #[test]
    fn same_refund_id_is_applied_once() {
        let mut record = succeeded(2000);
        assert!(record.apply(&refund("re_1", 500)).unwrap().is_applied());
        assert_eq!(
            record.apply(&refund("re_1", 500)).unwrap(),
            TransitionOutcome::AlreadyApplied
        );
        assert_eq!(record.refunded_amount, 500);
        assert_eq!(record.refunds.len(), 1);
    }

    #[test]
    fn known_refund_on_refunded_record_is_no_op() {
        let mut record = succeeded(800);
        record.apply(&refund("re_full", 800)).unwrap();
        assert_eq!(
            record.apply(&refund("re_full", 800)).unwrap(),
            TransitionOutcome::AlreadyApplied
        );
    }

    #[test]
    fn refund_over_balance_is_rejected() {
        let mut record = succeeded(2000);
        record.apply(&refund("re_1", 1000)).unwrap();
        let err = record.apply(&refund("re_2", 1500)).unwrap_err();
        assert_eq!(
            err,
            PaymentError::RefundExceedsBalance {
                requested: 1500,
                available: 1000
            }
        );
        assert_eq!(record.refunded_amount, 1000);
    }

    #[test]
    fn refund_of_pending_or_refunded_is_not_refundable() {
        let mut record = pending(2000);
        assert!(matches!(
            record.apply(&refund("re_1", 1)),
            Err(PaymentError::NotRefundable { .. })
        ));

        let mut record = succeeded(500);
        record.apply(&refund("re_1", 500)).unwrap();
        assert!(matches!(
            record.apply(&refund("re_2", 1)),
            Err(PaymentError::NotRefundable {
                status: PaymentStatus::Refunded,
                ..
            })
        ));
    }

    #[test]
    fn zero_refund_is_a_validation_error() {
        let mut record = succeeded(2000);
        assert!(matches!(
            record.apply(&refund("re_0", 0)),
            Err(PaymentError::ValidationFailed { .. })
        ));
    }

    proptest! {
        #[test]
        fn refunded_amount_never_exceeds_amount(
            amount in 1i64..100_000,
            refunds in proptest::collection::vec(1i64..50_000, 0..12),
        ) {
            let mut record = succeeded(amount);
            for (i, value) in refunds.into_iter().enumerate() {
                let _ = record.apply(&refund(&format!("re_{}", i), value));
                prop_assert!(record.refunded_amount <= record.amount.amount());
                prop_assert_eq!(
                    record.refunded_amount,
                    record.refunds.iter().map(|r| r.amount).sum::<i64>()
                );
                prop_assert_eq!(
                    record.status == PaymentStatus::Refunded,
                    record.refunded_amount == record.amount.amount()
                );
            }
        }
    }
}
