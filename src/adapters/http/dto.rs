//! Request and response bodies for the REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::IntentHandle;
use crate::domain::enrollment::Enrollment;
use crate::domain::foundation::{CourseId, EnrollmentId, PaymentId};
use crate::domain::payment::PaymentRecord;

// ════════════════════════════════════════════════════════════════════════════════
// Payments
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntentRequest {
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    pub payment_id: PaymentId,
    pub intent_id: String,
    pub client_secret: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
}

impl From<IntentHandle> for IntentResponse {
    fn from(handle: IntentHandle) -> Self {
        Self {
            payment_id: handle.payment_id,
            intent_id: handle.intent_id.as_str().to_string(),
            client_secret: handle.client_secret,
            amount: handle.amount.amount(),
            currency: handle.amount.currency().as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub intent_id: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundPaymentRequest {
    pub amount: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub intent_id: String,
    pub course_id: CourseId,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub refunded_amount: i64,
    pub net_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<DateTime<Utc>>,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            id: record.id,
            intent_id: record.intent_id.as_str().to_string(),
            course_id: record.course_id,
            amount: record.amount.amount(),
            currency: record.amount.currency().as_str().to_string(),
            status: record.status.as_str().to_string(),
            refunded_amount: record.refunded_amount,
            net_amount: record.net_amount(),
            payment_method: record.payment_method,
            failure_reason: record.failure_reason,
            created_at: *record.created_at.as_datetime(),
            paid_at: record.paid_at.map(|t| *t.as_datetime()),
            refunded_at: record.refunded_at.map(|t| *t.as_datetime()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentResponse>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Enrollments
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProgressRequest {
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgressRequest {
    #[serde(default)]
    pub watch_seconds: u32,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResponse {
    pub id: EnrollmentId,
    pub course_id: CourseId,
    pub status: String,
    pub progress: u8,
    pub enrolled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            course_id: enrollment.course_id,
            status: enrollment.status.as_str().to_string(),
            progress: enrollment.progress.value(),
            enrolled_at: *enrollment.enrolled_at.as_datetime(),
            completed_at: enrollment.completed_at.map(|t| *t.as_datetime()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentListResponse {
    pub enrollments: Vec<EnrollmentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub can_access: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: String,
}
