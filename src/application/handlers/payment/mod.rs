//! Payment handlers.
//!
//! All writes to payment records go through [`PaymentTransitions`].

mod orchestrator;
mod transitions;

pub use orchestrator::{
    ConfirmPaymentCommand, CreateIntentCommand, IntentHandle, PaymentOrchestrator,
    RefundPaymentCommand,
};
pub use transitions::{AppliedTransition, PaymentTransitions};
