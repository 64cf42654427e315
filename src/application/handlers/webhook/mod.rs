//! Webhook handlers.

mod reconciler;

pub use reconciler::WebhookReconciler;
