//! Shared wiring for the integration suites.
//!
//! Everything runs on the in-memory adapters and the mock gateway, with
//! concrete handles kept so tests can inspect store contents.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use edumaster_access::adapters::memory::{
    InMemoryCourseCatalog, InMemoryEnrollmentRepository, InMemoryPaymentRecordRepository,
    InMemoryWebhookEventLog, RecordingNotificationSink,
};
use edumaster_access::adapters::stripe::MockPaymentGateway;
use edumaster_access::application::{
    ConfirmPaymentCommand, CreateIntentCommand, IntentHandle, RetryPolicy,
};
use edumaster_access::bootstrap::{ServiceSettings, Services, Stores};
use edumaster_access::domain::course::CourseListing;
use edumaster_access::domain::foundation::{CourseId, Currency, IntentId, Money, Timestamp, UserId};
use edumaster_access::domain::payment::{GatewayEvent, GatewayEventKind, GatewayRefund, PaymentRecord};

pub struct Harness {
    pub catalog: Arc<InMemoryCourseCatalog>,
    pub payment_store: Arc<InMemoryPaymentRecordRepository>,
    pub enrollment_store: Arc<InMemoryEnrollmentRepository>,
    pub webhook_log: Arc<InMemoryWebhookEventLog>,
    pub gateway: Arc<MockPaymentGateway>,
    pub sink: Arc<RecordingNotificationSink>,
    pub services: Services,
}

impl Harness {
    pub fn new() -> Self {
        let catalog = Arc::new(InMemoryCourseCatalog::new());
        let payment_store = Arc::new(InMemoryPaymentRecordRepository::new());
        let enrollment_store = Arc::new(InMemoryEnrollmentRepository::new());
        let webhook_log = Arc::new(InMemoryWebhookEventLog::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let sink = Arc::new(RecordingNotificationSink::new());

        let stores = Stores {
            payments: payment_store.clone(),
            enrollments: enrollment_store.clone(),
            catalog: catalog.clone(),
            webhook_log: webhook_log.clone(),
        };
        let settings = ServiceSettings {
            currency: Currency::usd(),
            gateway_timeout: Duration::from_secs(2),
            max_conflict_retries: 10,
            retry_policy: RetryPolicy::immediate(2),
            notification_timeout: Duration::from_secs(1),
        };
        let services = Services::new(&stores, gateway.clone(), sink.clone(), &settings);

        Self {
            catalog,
            payment_store,
            enrollment_store,
            webhook_log,
            gateway,
            sink,
            services,
        }
    }

    /// Seeds a published course priced in cents.
    pub async fn course(&self, cents: i64) -> CourseListing {
        let course = CourseListing {
            id: CourseId::new(),
            title: format!("Course at {} cents", cents),
            price: Money::new(cents, Currency::usd()).unwrap(),
            published: true,
            total_lessons: 4,
        };
        self.catalog.upsert(course.clone()).await;
        course
    }

    pub async fn create_intent(&self, user: &UserId, course: &CourseListing) -> IntentHandle {
        self.services
            .payments
            .create_intent(CreateIntentCommand {
                user_id: user.clone(),
                course_id: course.id,
            })
            .await
            .unwrap()
    }

    /// CreateIntent then Confirm, both expected to succeed.
    pub async fn purchase(&self, user: &UserId, course: &CourseListing) -> PaymentRecord {
        let handle = self.create_intent(user, course).await;
        self.services
            .payments
            .confirm(ConfirmPaymentCommand {
                intent_id: handle.intent_id,
                payment_method: "pm_card_visa".to_string(),
            })
            .await
            .unwrap()
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn event(event_id: &str, intent_id: &IntentId, kind: GatewayEventKind) -> GatewayEvent {
    GatewayEvent {
        event_id: event_id.to_string(),
        intent_id: intent_id.clone(),
        kind,
        payload: serde_json::json!({ "id": event_id }),
        created_at: Timestamp::now(),
    }
}

pub fn succeeded(event_id: &str, intent_id: &IntentId) -> GatewayEvent {
    event(
        event_id,
        intent_id,
        GatewayEventKind::Succeeded {
            payment_method: Some("pm_card_visa".to_string()),
        },
    )
}

pub fn charge_refunded(event_id: &str, intent_id: &IntentId, refunds: &[(&str, i64)]) -> GatewayEvent {
    event(
        event_id,
        intent_id,
        GatewayEventKind::ChargeRefunded {
            refunds: refunds
                .iter()
                .map(|(id, amount)| GatewayRefund {
                    refund_id: id.to_string(),
                    amount: *amount,
                    reason: None,
                })
                .collect(),
            reversed: Vec::new(),
        },
    )
}

/// `charge.refunded` whose listed refunds all failed at the gateway.
pub fn refunds_reversed(event_id: &str, intent_id: &IntentId, refund_ids: &[&str]) -> GatewayEvent {
    event(
        event_id,
        intent_id,
        GatewayEventKind::ChargeRefunded {
            refunds: Vec::new(),
            reversed: refund_ids.iter().map(|id| id.to_string()).collect(),
        },
    )
}
