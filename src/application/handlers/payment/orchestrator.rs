//! PaymentOrchestrator - drives the gateway through intent, confirm and refund.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::application::handlers::enrollment::EnrollmentManager;
use crate::domain::foundation::{CourseId, Currency, IntentId, Money, PaymentId, UserId};
use crate::domain::payment::{
    PaymentError, PaymentRecord, PaymentStatus, PaymentTransition, TransitionOutcome,
};
use crate::ports::{
    ConfirmIntentRequest, CourseCatalog, CreateIntentRequest, GatewayError, GatewayErrorCode,
    IntentStatus, PaymentGateway, PaymentRecordRepository, RefundRequest,
};

use super::transitions::PaymentTransitions;

/// Command to start a purchase.
#[derive(Debug, Clone)]
pub struct CreateIntentCommand {
    pub user_id: UserId,
    pub course_id: CourseId,
}

/// Handle the client needs to complete payment out-of-band.
#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub payment_id: PaymentId,
    pub intent_id: IntentId,
    pub client_secret: String,
    pub amount: Money,
}

/// Command to confirm an intent with a payment method.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    pub intent_id: IntentId,
    pub payment_method: String,
}

/// Command to refund part or all of a captured payment.
#[derive(Debug, Clone)]
pub struct RefundPaymentCommand {
    pub payment_id: PaymentId,

    /// Amount in minor units.
    pub amount: i64,

    pub reason: Option<String>,
}

pub struct PaymentOrchestrator {
    payments: Arc<dyn PaymentRecordRepository>,
    catalog: Arc<dyn CourseCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    enrollments: Arc<EnrollmentManager>,
    transitions: Arc<PaymentTransitions>,
    currency: Currency,
    gateway_timeout: Duration,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: Arc<dyn PaymentRecordRepository>,
        catalog: Arc<dyn CourseCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        enrollments: Arc<EnrollmentManager>,
        transitions: Arc<PaymentTransitions>,
        currency: Currency,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            payments,
            catalog,
            gateway,
            enrollments,
            transitions,
            currency,
            gateway_timeout,
        }
    }

    /// Creates a remote intent and records it as PENDING.
    ///
    /// The local record is written only after the gateway returned an intent
    /// id, so a failed or timed-out call leaves nothing behind.
    pub async fn create_intent(&self, cmd: CreateIntentCommand) -> Result<IntentHandle, PaymentError> {
        // 1. Course must be purchasable in the configured currency
        let course = self
            .catalog
            .find_course(&cmd.course_id)
            .await?
            .ok_or(PaymentError::CourseNotFound(cmd.course_id))?;
        if let Some(reason) = course.purchase_blocker() {
            return Err(PaymentError::invalid_course_state(course.id, reason));
        }
        if course.price.currency() != &self.currency {
            return Err(PaymentError::invalid_course_state(
                course.id,
                format!(
                    "priced in {}, payments are taken in {}",
                    course.price.currency(),
                    self.currency
                ),
            ));
        }

        // 2. Not bought, not enrolled
        if self
            .payments
            .find_succeeded(&cmd.user_id, &cmd.course_id)
            .await?
            .is_some()
        {
            return Err(PaymentError::AlreadyPurchased {
                user_id: cmd.user_id,
                course_id: cmd.course_id,
            });
        }
        if self
            .enrollments
            .is_enrolled(&cmd.user_id, &cmd.course_id)
            .await
            .map_err(|e| PaymentError::infrastructure(e.to_string()))?
        {
            return Err(PaymentError::AlreadyEnrolled {
                user_id: cmd.user_id,
                course_id: cmd.course_id,
            });
        }

        // 3. Remote intent first
        let payment_id = PaymentId::new();
        let mut metadata = BTreeMap::new();
        metadata.insert("user_id".to_string(), cmd.user_id.to_string());
        metadata.insert("course_id".to_string(), course.id.to_string());
        metadata.insert("course_title".to_string(), course.title.clone());
        metadata.insert("payment_id".to_string(), payment_id.to_string());

        let intent = self
            .call_gateway(
                "create_intent",
                self.gateway.create_intent(CreateIntentRequest {
                    amount: course.price.clone(),
                    description: format!("Payment for course: {}", course.title),
                    metadata,
                    idempotency_key: format!("create-{}", payment_id),
                }),
            )
            .await
            .map_err(gateway_failure)?;

        // 4. Then the local record
        let record = PaymentRecord::new_pending(
            payment_id,
            intent.intent_id.clone(),
            cmd.user_id,
            course.id,
            course.price.clone(),
        );
        if let Err(e) = self.payments.insert(&record).await {
            tracing::error!(
                payment_id = %payment_id,
                intent_id = %intent.intent_id,
                error = %e,
                "Remote intent created but local record failed; intent will never be confirmed"
            );
            return Err(e.into());
        }

        tracing::info!(
            payment_id = %payment_id,
            intent_id = %intent.intent_id,
            user_id = %record.user_id,
            course_id = %record.course_id,
            amount = %record.amount,
            "Payment intent created"
        );

        Ok(IntentHandle {
            payment_id,
            intent_id: intent.intent_id,
            client_secret: intent.client_secret,
            amount: record.amount,
        })
    }

    /// Confirms an intent and converges the record to what the gateway reports.
    ///
    /// "Requires action" and "processing" return the PENDING record unchanged.
    pub async fn confirm(&self, cmd: ConfirmPaymentCommand) -> Result<PaymentRecord, PaymentError> {
        // 1. Load and check status
        let record = self
            .payments
            .find_by_intent_id(&cmd.intent_id)
            .await?
            .ok_or_else(|| PaymentError::intent_not_found(cmd.intent_id.clone()))?;

        match record.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Succeeded => {
                // The webhook got here first.
                let applied = self
                    .transitions
                    .apply(record, &PaymentTransition::Succeed { payment_method: None })
                    .await?;
                return Ok(applied.record);
            }
            status => {
                return Err(PaymentError::NotPending {
                    payment_id: record.id,
                    status,
                })
            }
        }

        // 2. Refuse a second purchase before charging
        if let Some(existing) = self
            .payments
            .find_succeeded(&record.user_id, &record.course_id)
            .await?
        {
            tracing::warn!(
                payment_id = %record.id,
                existing_payment_id = %existing.id,
                "Course already purchased, canceling pending payment"
            );
            let user_id = record.user_id.clone();
            let course_id = record.course_id;
            self.transitions
                .apply(
                    record,
                    &PaymentTransition::Cancel {
                        reason: Some("duplicate purchase".to_string()),
                    },
                )
                .await?;
            return Err(PaymentError::AlreadyPurchased { user_id, course_id });
        }

        // 3. Confirm remotely
        let confirmed = match self
            .call_gateway(
                "confirm_intent",
                self.gateway.confirm_intent(ConfirmIntentRequest {
                    intent_id: cmd.intent_id.clone(),
                    payment_method: cmd.payment_method.clone(),
                    idempotency_key: confirm_idempotency_key(&cmd),
                }),
            )
            .await
        {
            Ok(confirmed) => confirmed,
            Err(e) if e.code == GatewayErrorCode::Declined => {
                self.transitions
                    .apply(
                        record,
                        &PaymentTransition::Fail {
                            reason: e.message.clone(),
                        },
                    )
                    .await?;
                return Err(PaymentError::declined(e.message));
            }
            Err(e) => return Err(gateway_failure(e)),
        };

        // 4. Converge
        match confirmed.status {
            IntentStatus::Succeeded => {
                let payment_method = confirmed.payment_method.or(Some(cmd.payment_method));
                let applied = self
                    .transitions
                    .apply(record, &PaymentTransition::Succeed { payment_method })
                    .await?;
                match applied.outcome {
                    // Settled as failed or canceled while the gateway call was in flight.
                    TransitionOutcome::Superseded { current }
                        if matches!(current, PaymentStatus::Failed | PaymentStatus::Canceled) =>
                    {
                        tracing::error!(
                            payment_id = %applied.record.id,
                            intent_id = %applied.record.intent_id,
                            user_id = %applied.record.user_id,
                            course_id = %applied.record.course_id,
                            status = %current,
                            "Gateway captured a payment already recorded as settled, needs manual reconciliation"
                        );
                        Err(PaymentError::CapturedAfterSettlement {
                            payment_id: applied.record.id,
                            status: current,
                        })
                    }
                    _ => Ok(applied.record),
                }
            }
            IntentStatus::RequiresAction | IntentStatus::Processing => {
                tracing::info!(
                    payment_id = %record.id,
                    intent_id = %record.intent_id,
                    status = ?confirmed.status,
                    "Confirmation pending further action"
                );
                Ok(record)
            }
            IntentStatus::RequiresPaymentMethod => {
                let reason = "payment method was not accepted".to_string();
                self.transitions
                    .apply(record, &PaymentTransition::Fail { reason: reason.clone() })
                    .await?;
                Err(PaymentError::declined(reason))
            }
            IntentStatus::Failed { reason } => {
                self.transitions
                    .apply(record, &PaymentTransition::Fail { reason: reason.clone() })
                    .await?;
                Err(PaymentError::declined(reason))
            }
            IntentStatus::Canceled { reason } => {
                self.transitions
                    .apply(record, &PaymentTransition::Cancel { reason: reason.clone() })
                    .await?;
                Err(PaymentError::declined(
                    reason.unwrap_or_else(|| "payment was canceled".to_string()),
                ))
            }
        }
    }

    /// Refunds part or all of a SUCCEEDED payment.
    ///
    /// Enrollment is left in place.
    pub async fn refund(&self, cmd: RefundPaymentCommand) -> Result<PaymentRecord, PaymentError> {
        // 1. Validate against the stored record
        let record = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or(PaymentError::NotFound(cmd.payment_id))?;

        if cmd.amount <= 0 {
            return Err(PaymentError::validation(
                "amount",
                "Refund amount must be greater than zero",
            ));
        }
        if record.status != PaymentStatus::Succeeded {
            return Err(PaymentError::NotRefundable {
                payment_id: record.id,
                status: record.status,
            });
        }
        let available = record.refundable_amount();
        if cmd.amount > available {
            return Err(PaymentError::RefundExceedsBalance {
                requested: cmd.amount,
                available,
            });
        }

        // 2. Refund remotely
        let refund = self
            .call_gateway(
                "refund",
                self.gateway.refund(RefundRequest {
                    intent_id: record.intent_id.clone(),
                    amount: cmd.amount,
                    reason: cmd.reason.clone(),
                    idempotency_key: format!(
                        "refund-{}-{}-{}",
                        record.id, record.refunded_amount, cmd.amount
                    ),
                }),
            )
            .await
            .map_err(gateway_failure)?;

        // Pending counts as accepted. If it fails later, `charge.refunded`
        // lists it as reversed and the reconciler dead-letters it.
        if !refund.status.is_accepted() {
            return Err(PaymentError::gateway_rejected(format!(
                "refund {} was not accepted: {:?}",
                refund.refund_id, refund.status
            )));
        }

        // 3. Record it
        let applied = self
            .transitions
            .apply(
                record,
                &PaymentTransition::Refund {
                    refund_id: refund.refund_id,
                    amount: cmd.amount,
                    reason: cmd.reason,
                },
            )
            .await?;
        Ok(applied.record)
    }

    pub async fn find(&self, payment_id: &PaymentId) -> Result<PaymentRecord, PaymentError> {
        self.payments
            .find_by_id(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(*payment_id))
    }

    pub async fn payments_for_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, PaymentError> {
        Ok(self.payments.list_by_user(user_id).await?)
    }

    pub async fn has_paid(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, PaymentError> {
        Ok(self
            .payments
            .find_succeeded(user_id, course_id)
            .await?
            .is_some())
    }

    /// Bounds a gateway call by the configured timeout.
    async fn call_gateway<T, F>(&self, operation: &'static str, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.gateway_timeout.as_millis() as u64,
                    "Gateway call timed out"
                );
                Err(GatewayError::unavailable(format!(
                    "{} timed out after {:?}",
                    operation, self.gateway_timeout
                )))
            }
        }
    }
}

/// Fresh key per Confirm call.
///
/// A retried Confirm (after 3-D Secure, or with another card) must reach the
/// gateway as a new request instead of replaying the first response.
fn confirm_idempotency_key(cmd: &ConfirmPaymentCommand) -> String {
    format!(
        "confirm-{}-{}-{}",
        cmd.intent_id,
        cmd.payment_method,
        Uuid::new_v4().simple()
    )
}

fn gateway_failure(err: GatewayError) -> PaymentError {
    match err.code {
        GatewayErrorCode::Unavailable => PaymentError::gateway_unavailable(err.message),
        GatewayErrorCode::Declined => PaymentError::declined(err.message),
        GatewayErrorCode::InvalidRequest | GatewayErrorCode::Authentication => {
            PaymentError::gateway_rejected(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCourseCatalog, InMemoryEnrollmentRepository, InMemoryPaymentRecordRepository,
        RecordingNotificationSink,
    };
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::application::Notifier;
    use crate::domain::course::CourseListing;
    use crate::ports::{EnrollmentRepository, NotificationKind};

    struct Fixture {
        orchestrator: PaymentOrchestrator,
        gateway: Arc<MockPaymentGateway>,
        payments: Arc<InMemoryPaymentRecordRepository>,
        enrollments: Arc<InMemoryEnrollmentRepository>,
        catalog: Arc<InMemoryCourseCatalog>,
        sink: Arc<RecordingNotificationSink>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(InMemoryCourseCatalog::new());
        let payments = Arc::new(InMemoryPaymentRecordRepository::new());
        let enrollments = Arc::new(InMemoryEnrollmentRepository::new());
        let sink = Arc::new(RecordingNotificationSink::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let notifier = Notifier::new(sink.clone(), Duration::from_secs(1));

        let manager = Arc::new(EnrollmentManager::new(
            enrollments.clone(),
            payments.clone(),
            catalog.clone(),
            notifier.clone(),
            3,
        ));
        let transitions = Arc::new(PaymentTransitions::new(
            payments.clone(),
            manager.clone(),
            notifier,
            3,
        ));
        let orchestrator = PaymentOrchestrator::new(
            payments.clone(),
            catalog.clone(),
            gateway.clone(),
            manager,
            transitions,
            Currency::usd(),
            Duration::from_millis(200),
        );

        Fixture {
            orchestrator,
            gateway,
            payments,
            enrollments,
            catalog,
            sink,
        }
    }

    async fn course(f: &Fixture, price: i64) -> CourseListing {
        let course = CourseListing {
            id: CourseId::new(),
            title: "Lifetimes Demystified".to_string(),
            price: Money::new(price, Currency::usd()).unwrap(),
            published: true,
            total_lessons: 8,
        };
        f.catalog.upsert(course.clone()).await;
        course
    }

    fn buyer() -> UserId {
        UserId::new("buyer-42").unwrap()
    }

    async fn purchased(f: &Fixture, price: i64) -> PaymentRecord {
        let course = course(f, price).await;
        let handle = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: course.id,
            })
            .await
            .unwrap();
        f.orchestrator
            .confirm(ConfirmPaymentCommand {
                intent_id: handle.intent_id,
                payment_method: "pm_card_visa".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_intent_records_pending_with_metadata() {
        let f = fixture();
        let course = course(&f, 2000).await;

        let handle = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: course.id,
            })
            .await
            .unwrap();

        let stored = f.payments.find_by_intent_id(&handle.intent_id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert_eq!(stored.id, handle.payment_id);
        assert_eq!(stored.amount.amount(), 2000);

        let request = f.gateway.last_create_request().await.unwrap();
        assert_eq!(request.description, "Payment for course: Lifetimes Demystified");
        assert_eq!(request.metadata["payment_id"], handle.payment_id.to_string());
        assert_eq!(request.idempotency_key, format!("create-{}", handle.payment_id));
    }

    #[tokio::test]
    async fn create_intent_gateway_failure_leaves_no_record() {
        let f = fixture();
        let course = course(&f, 2000).await;
        f.gateway
            .fail_next_create(GatewayError::unavailable("503 from gateway"))
            .await;

        let err = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: course.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::GatewayUnavailable(_)));
        assert!(f.payments.list_by_user(&buyer()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_intent_timeout_leaves_no_record() {
        let f = fixture();
        let course = course(&f, 2000).await;
        f.gateway.set_delay(Duration::from_secs(5)).await;

        let err = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: course.id,
            })
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(f.payments.list_by_user(&buyer()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn free_course_cannot_be_bought() {
        let f = fixture();
        let free = course(&f, 0).await;

        let err = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: free.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::InvalidCourseState { .. }));
    }

    #[tokio::test]
    async fn purchased_course_cannot_be_bought_again() {
        let f = fixture();
        let paid = purchased(&f, 2000).await;

        let err = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: paid.course_id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::AlreadyPurchased { .. }));
    }

    #[tokio::test]
    async fn confirm_success_enrolls() {
        let f = fixture();
        let paid = purchased(&f, 2000).await;

        assert_eq!(paid.status, PaymentStatus::Succeeded);
        assert_eq!(paid.payment_method.as_deref(), Some("pm_card_visa"));
        assert!(paid.paid_at.is_some());
        assert!(f
            .enrollments
            .find_by_pair(&paid.user_id, &paid.course_id)
            .await
            .unwrap()
            .is_some());
        assert_eq!(f.sink.count(NotificationKind::PaymentSucceeded).await, 1);
    }

    #[tokio::test]
    async fn confirm_requires_action_keeps_pending() {
        let f = fixture();
        let course = course(&f, 2000).await;
        let handle = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: course.id,
            })
            .await
            .unwrap();
        f.gateway.set_confirm_status(IntentStatus::RequiresAction).await;

        let record = f
            .orchestrator
            .confirm(ConfirmPaymentCommand {
                intent_id: handle.intent_id,
                payment_method: "pm_card_threeDSecure2Required".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(record.status, PaymentStatus::Pending);
        assert!(f
            .enrollments
            .find_by_pair(&record.user_id, &record.course_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn confirm_decline_fails_record() {
        let f = fixture();
        let course = course(&f, 2000).await;
        let handle = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: course.id,
            })
            .await
            .unwrap();
        f.gateway
            .fail_next_confirm(GatewayError::declined("card_declined"))
            .await;

        let err = f
            .orchestrator
            .confirm(ConfirmPaymentCommand {
                intent_id: handle.intent_id.clone(),
                payment_method: "pm_card_chargeDeclined".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Declined { .. }));
        let stored = f.payments.find_by_intent_id(&handle.intent_id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("card_declined"));

        let again = f
            .orchestrator
            .confirm(ConfirmPaymentCommand {
                intent_id: handle.intent_id,
                payment_method: "pm_card_visa".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(again, PaymentError::NotPending { .. }));
    }

    #[tokio::test]
    async fn confirm_gateway_outage_keeps_pending() {
        let f = fixture();
        let course = course(&f, 2000).await;
        let handle = f
            .orchestrator
            .create_intent(CreateIntentCommand {
                user_id: buyer(),
                course_id: course.id,
            })
            .await
            .unwrap();
        f.gateway
            .fail_next_confirm(GatewayError::unavailable("connection reset"))
            .await;

        let err = f
            .orchestrator
            .confirm(ConfirmPaymentCommand {
                intent_id: handle.intent_id.clone(),
                payment_method: "pm_card_visa".to_string(),
            })
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        let stored = f.payments.find_by_intent_id(&handle.intent_id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn confirm_unknown_intent_is_not_found() {
        let f = fixture();
        let err = f
            .orchestrator
            .confirm(ConfirmPaymentCommand {
                intent_id: IntentId::new("pi_missing").unwrap(),
                payment_method: "pm_card_visa".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::IntentNotFound(_)));
    }

    #[tokio::test]
    async fn partial_then_excess_refund() {
        let f = fixture();
        let paid = purchased(&f, 2000).await;

        let partial = f
            .orchestrator
            .refund(RefundPaymentCommand {
                payment_id: paid.id,
                amount: 1000,
                reason: Some("requested_by_customer".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(partial.status, PaymentStatus::Succeeded);
        assert_eq!(partial.refunded_amount, 1000);
        assert_eq!(partial.net_amount(), 1000);

        let err = f
            .orchestrator
            .refund(RefundPaymentCommand {
                payment_id: paid.id,
                amount: 1500,
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::RefundExceedsBalance {
                requested: 1500,
                available: 1000
            }
        ));
        assert_eq!(f.gateway.refund_calls().await, 1);
    }

    #[tokio::test]
    async fn full_refund_keeps_enrollment() {
        let f = fixture();
        let paid = purchased(&f, 2000).await;

        let refunded = f
            .orchestrator
            .refund(RefundPaymentCommand {
                payment_id: paid.id,
                amount: 2000,
                reason: None,
            })
            .await
            .unwrap();

        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert!(refunded.refunded_at.is_some());
        assert!(f
            .enrollments
            .find_by_pair(&paid.user_id, &paid.course_id)
            .await
            .unwrap()
            .is_some());

        let err = f
            .orchestrator
            .refund(RefundPaymentCommand {
                payment_id: paid.id,
                amount: 1,
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotRefundable { .. }));
    }

    #[tokio::test]
    async fn refund_idempotency_key_tracks_balance() {
        let f = fixture();
        let paid = purchased(&f, 2000).await;

        f.orchestrator
            .refund(RefundPaymentCommand {
                payment_id: paid.id,
                amount: 500,
                reason: None,
            })
            .await
            .unwrap();

        let request = f.gateway.last_refund_request().await.unwrap();
        assert_eq!(request.idempotency_key, format!("refund-{}-0-500", paid.id));
    }

    #[tokio::test]
    async fn has_paid_reflects_success() {
        let f = fixture();
        let paid = purchased(&f, 2000).await;

        assert!(f.orchestrator.has_paid(&buyer(), &paid.course_id).await.unwrap());
        assert!(!f.orchestrator.has_paid(&buyer(), &CourseId::new()).await.unwrap());
        assert_eq!(f.orchestrator.payments_for_user(&buyer()).await.unwrap().len(), 1);
    }
}
