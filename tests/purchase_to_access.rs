//! End-to-end purchase-to-access flows on the in-memory adapters.

mod common;

use std::sync::Arc;
use std::time::Duration;

use edumaster_access::application::{ConfirmPaymentCommand, EnrollCommand, RefundPaymentCommand};
use edumaster_access::domain::enrollment::CompletionStatus;
use edumaster_access::domain::payment::{GatewayEventKind, PaymentError, PaymentStatus};
use edumaster_access::ports::{
    EnrollmentRepository, IntentStatus, NotificationKind, PaymentRecordRepository, WebhookOutcome,
};

use common::{event, succeeded, user, Harness};

// =============================================================================
// Purchase
// =============================================================================

#[tokio::test]
async fn paid_purchase_enrolls_the_payer() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-a");

    let record = h.purchase(&payer, &course).await;

    assert_eq!(record.status, PaymentStatus::Succeeded);
    assert_eq!(record.amount.amount(), 2000);
    assert!(record.paid_at.is_some());

    let enrollment = h
        .enrollment_store
        .find_by_pair(&payer, &course.id)
        .await
        .unwrap()
        .expect("enrollment should exist");
    assert_eq!(enrollment.status, CompletionStatus::Enrolled);
    assert_eq!(enrollment.progress.value(), 0);

    assert_eq!(h.sink.count(NotificationKind::PaymentSucceeded).await, 1);
    assert_eq!(h.sink.count(NotificationKind::Enrolled).await, 1);
}

#[tokio::test]
async fn redelivered_success_webhook_changes_nothing() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-b");

    let record = h.purchase(&payer, &course).await;
    let before = h.payment_store.find_by_id(&record.id).await.unwrap().unwrap();

    let outcome = h
        .services
        .reconciler
        .handle(succeeded("evt_late_1", &record.intent_id))
        .await;

    assert_eq!(outcome, WebhookOutcome::NoOp);
    assert_eq!(h.enrollment_store.count_for_pair(&payer, &course.id).await, 1);
    let after = h.payment_store.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(h.sink.count(NotificationKind::Enrolled).await, 1);
}

#[tokio::test]
async fn free_course_enrolls_without_payment() {
    let h = Harness::new();
    let course = h.course(0).await;
    let learner = user("learner-c");

    let result = h
        .services
        .enrollments
        .enroll(EnrollCommand {
            user_id: learner.clone(),
            course_id: course.id,
        })
        .await
        .unwrap();

    assert!(result.created);
    assert!(h.payment_store.is_empty().await);
    assert_eq!(h.gateway.confirm_calls().await, 0);
    assert!(h
        .services
        .enrollments
        .can_access(&learner, &course.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn partial_refund_keeps_payment_succeeded_and_bounds_the_balance() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-d");
    let record = h.purchase(&payer, &course).await;

    let refunded = h
        .services
        .payments
        .refund(RefundPaymentCommand {
            payment_id: record.id,
            amount: 1000,
            reason: Some("partial".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(refunded.status, PaymentStatus::Succeeded);
    assert_eq!(refunded.refunded_amount, 1000);
    assert_eq!(refunded.net_amount(), 1000);

    let err = h
        .services
        .payments
        .refund(RefundPaymentCommand {
            payment_id: record.id,
            amount: 1500,
            reason: None,
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PaymentError::RefundExceedsBalance {
            requested: 1500,
            available: 1000
        }
    );
    assert_eq!(h.gateway.refund_calls().await, 1);

    // Access survives the refund.
    assert!(h.services.enrollments.is_enrolled(&payer, &course.id).await.unwrap());
}

#[tokio::test]
async fn concurrent_confirms_record_one_success() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-e");
    let handle = h.create_intent(&payer, &course).await;

    let payments = h.services.payments.clone();
    let confirms = (0..2).map(|_| {
        let payments = Arc::clone(&payments);
        let intent_id = handle.intent_id.clone();
        async move {
            payments
                .confirm(ConfirmPaymentCommand {
                    intent_id,
                    payment_method: "pm_card_visa".to_string(),
                })
                .await
        }
    });
    let results = futures::future::join_all(confirms).await;

    for result in &results {
        let record = result.as_ref().expect("both confirms should report success");
        assert_eq!(record.status, PaymentStatus::Succeeded);
    }
    let stored = h
        .payment_store
        .find_by_id(&handle.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Succeeded);
    assert_eq!(h.enrollment_store.count_for_pair(&payer, &course.id).await, 1);
    assert_eq!(h.sink.count(NotificationKind::PaymentSucceeded).await, 1);
    assert_eq!(h.sink.count(NotificationKind::Enrolled).await, 1);
}

#[tokio::test]
async fn capture_landing_on_a_failed_record_is_reported_not_swallowed() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-f");
    let handle = h.create_intent(&payer, &course).await;

    // Hold the confirm call at the gateway while the failure webhook settles the record.
    h.gateway.set_delay(Duration::from_millis(300)).await;
    let payments = Arc::clone(&h.services.payments);
    let intent_id = handle.intent_id.clone();
    let confirm = tokio::spawn(async move {
        payments
            .confirm(ConfirmPaymentCommand {
                intent_id,
                payment_method: "pm_card_visa".to_string(),
            })
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let outcome = h
        .services
        .reconciler
        .handle(event(
            "evt_fail_mid_confirm",
            &handle.intent_id,
            GatewayEventKind::PaymentFailed {
                reason: "card_declined".to_string(),
            },
        ))
        .await;
    assert_eq!(outcome, WebhookOutcome::Applied);

    let err = confirm.await.unwrap().unwrap_err();
    assert_eq!(
        err,
        PaymentError::CapturedAfterSettlement {
            payment_id: handle.payment_id,
            status: PaymentStatus::Failed,
        }
    );

    let stored = h
        .payment_store
        .find_by_id(&handle.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert!(!h.services.enrollments.is_enrolled(&payer, &course.id).await.unwrap());
    assert_eq!(h.sink.count(NotificationKind::PaymentSucceeded).await, 0);
}

// =============================================================================
// Guards
// =============================================================================

#[tokio::test]
async fn second_intent_after_purchase_is_refused() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-f");
    h.purchase(&payer, &course).await;

    let err = h
        .services
        .payments
        .create_intent(edumaster_access::application::CreateIntentCommand {
            user_id: payer,
            course_id: course.id,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PaymentError::AlreadyPurchased { .. } | PaymentError::AlreadyEnrolled { .. }
    ));
}

#[tokio::test]
async fn confirming_a_stale_intent_after_another_purchase_cancels_it() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-g");

    let first = h.create_intent(&payer, &course).await;
    let second = h.create_intent(&payer, &course).await;

    h.services
        .payments
        .confirm(ConfirmPaymentCommand {
            intent_id: first.intent_id,
            payment_method: "pm_card_visa".to_string(),
        })
        .await
        .unwrap();

    let err = h
        .services
        .payments
        .confirm(ConfirmPaymentCommand {
            intent_id: second.intent_id,
            payment_method: "pm_card_visa".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::AlreadyPurchased { .. }));
    let stale = h
        .payment_store
        .find_by_id(&second.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stale.status, PaymentStatus::Canceled);
    assert_eq!(h.gateway.confirm_calls().await, 1);
}

#[tokio::test]
async fn unpublished_free_course_is_not_open() {
    let h = Harness::new();
    let mut course = h.course(0).await;
    course.published = false;
    h.catalog.upsert(course.clone()).await;

    let err = h
        .services
        .enrollments
        .enroll(EnrollCommand {
            user_id: user("learner-h"),
            course_id: course.id,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        edumaster_access::domain::enrollment::EnrollmentError::CourseNotOpen { .. }
    ));
}

#[tokio::test]
async fn paid_course_without_payment_is_refused() {
    let h = Harness::new();
    let course = h.course(2000).await;

    let err = h
        .services
        .enrollments
        .enroll(EnrollCommand {
            user_id: user("learner-i"),
            course_id: course.id,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        edumaster_access::domain::enrollment::EnrollmentError::PaymentRequired { .. }
    ));
}

#[tokio::test]
async fn requires_action_leaves_the_payment_pending_until_the_webhook() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-j");
    h.gateway.set_confirm_status(IntentStatus::RequiresAction).await;

    let handle = h.create_intent(&payer, &course).await;
    let record = h
        .services
        .payments
        .confirm(ConfirmPaymentCommand {
            intent_id: handle.intent_id.clone(),
            payment_method: "pm_card_3ds".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Pending);
    assert!(!h.services.enrollments.is_enrolled(&payer, &course.id).await.unwrap());

    let outcome = h
        .services
        .reconciler
        .handle(succeeded("evt_3ds_done", &handle.intent_id))
        .await;

    assert_eq!(outcome, WebhookOutcome::Applied);
    assert!(h.services.enrollments.is_enrolled(&payer, &course.id).await.unwrap());
    assert!(h.services.payments.has_paid(&payer, &course.id).await.unwrap());
}

#[tokio::test]
async fn confirm_retried_after_authentication_is_a_fresh_gateway_request() {
    let h = Harness::new();
    let course = h.course(2000).await;
    let payer = user("learner-k");
    h.gateway.set_confirm_status(IntentStatus::RequiresAction).await;

    let handle = h.create_intent(&payer, &course).await;
    let confirm = || ConfirmPaymentCommand {
        intent_id: handle.intent_id.clone(),
        payment_method: "pm_card_3ds".to_string(),
    };

    let pending = h.services.payments.confirm(confirm()).await.unwrap();
    assert_eq!(pending.status, PaymentStatus::Pending);
    let first_key = h.gateway.last_confirm_request().await.unwrap().idempotency_key;

    // Customer finished 3-D Secure; the gateway now captures.
    h.gateway.set_confirm_status(IntentStatus::Succeeded).await;
    let paid = h.services.payments.confirm(confirm()).await.unwrap();
    let second_key = h.gateway.last_confirm_request().await.unwrap().idempotency_key;

    assert_ne!(first_key, second_key);
    assert!(first_key.starts_with(&format!("confirm-{}-", handle.intent_id)));
    assert_eq!(paid.status, PaymentStatus::Succeeded);
    assert_eq!(h.gateway.confirm_calls().await, 2);
    assert!(h.services.enrollments.is_enrolled(&payer, &course.id).await.unwrap());
}
