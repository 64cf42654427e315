//! Shared application state for the HTTP adapter.

use std::sync::Arc;

use crate::adapters::stripe::StripeWebhookVerifier;
use crate::application::{EnrollmentManager, PaymentOrchestrator, WebhookReconciler};

/// Cloned into every request; all members are `Arc`-shared.
#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentOrchestrator>,
    pub enrollments: Arc<EnrollmentManager>,
    pub reconciler: Arc<WebhookReconciler>,
    pub webhook_verifier: Arc<StripeWebhookVerifier>,
}
