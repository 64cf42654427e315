//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;
pub mod notifier;
pub mod retry;

pub use handlers::{
    // Enrollment
    EnrollCommand, EnrollResult, EnrollmentManager, RecordLessonProgressCommand,
    UpdateProgressCommand,
    // Payment
    AppliedTransition, ConfirmPaymentCommand, CreateIntentCommand, IntentHandle,
    PaymentOrchestrator, PaymentTransitions, RefundPaymentCommand,
    // Webhook
    WebhookReconciler,
};
pub use notifier::Notifier;
pub use retry::{retry_with_backoff, RetryError, RetryPolicy};
