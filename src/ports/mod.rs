//! Ports - interfaces between the application core and the outside world.
//!
//! Adapters implement these; handlers depend on them as `Arc<dyn Trait>`.

mod course_catalog;
mod enrollment_repository;
mod notification_sink;
mod payment_gateway;
mod payment_record_repository;
mod webhook_event_log;

pub use course_catalog::CourseCatalog;
pub use enrollment_repository::{EnrollmentRepository, InsertResult};
pub use notification_sink::{Notification, NotificationKind, NotificationSink};
pub use payment_gateway::{
    ConfirmIntentRequest, ConfirmResult, CreateIntentRequest, GatewayError, GatewayErrorCode,
    GatewayIntent, IntentStatus, PaymentGateway, RefundRequest, RefundResult, RefundStatus,
};
pub use payment_record_repository::PaymentRecordRepository;
pub use webhook_event_log::{WebhookEventEntry, WebhookEventLog, WebhookOutcome};

/// Result of a compare-and-set update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Stored version matched and the write went through.
    Updated,

    /// Someone else wrote first; reload and retry.
    VersionConflict,
}
