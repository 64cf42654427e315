//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod enrollment;
pub mod payment;
pub mod webhook;

pub use enrollment::{
    EnrollCommand, EnrollResult, EnrollmentManager, RecordLessonProgressCommand,
    UpdateProgressCommand,
};
pub use payment::{
    AppliedTransition, ConfirmPaymentCommand, CreateIntentCommand, IntentHandle,
    PaymentOrchestrator, PaymentTransitions, RefundPaymentCommand,
};
pub use webhook::WebhookReconciler;
