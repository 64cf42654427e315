//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Configurable confirm and refund statuses
//! - One-shot error injection per operation
//! - Artificial latency, for timeout tests
//! - Request capture for assertions

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::IntentId;
use crate::ports::{
    ConfirmIntentRequest, ConfirmResult, CreateIntentRequest, GatewayError, GatewayIntent,
    IntentStatus, PaymentGateway, RefundRequest, RefundResult, RefundStatus,
};

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.set_confirm_status(IntentStatus::RequiresAction).await;
/// gateway.fail_next_refund(GatewayError::unavailable("down")).await;
/// ```
#[derive(Default)]
pub struct MockPaymentGateway {
    inner: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    next_intent: u64,
    next_refund: u64,

    /// Status returned by confirm; `Succeeded` when unset.
    confirm_status: Option<IntentStatus>,

    /// Status returned by refund; `Succeeded` when unset.
    refund_status: Option<RefundStatus>,

    create_error: Option<GatewayError>,
    confirm_error: Option<GatewayError>,
    refund_error: Option<GatewayError>,

    delay: Option<Duration>,

    create_requests: Vec<CreateIntentRequest>,
    confirm_requests: Vec<ConfirmIntentRequest>,
    refund_requests: Vec<RefundRequest>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_confirm_status(&self, status: IntentStatus) {
        self.inner.lock().await.confirm_status = Some(status);
    }

    pub async fn set_refund_status(&self, status: RefundStatus) {
        self.inner.lock().await.refund_status = Some(status);
    }

    pub async fn fail_next_create(&self, error: GatewayError) {
        self.inner.lock().await.create_error = Some(error);
    }

    pub async fn fail_next_confirm(&self, error: GatewayError) {
        self.inner.lock().await.confirm_error = Some(error);
    }

    pub async fn fail_next_refund(&self, error: GatewayError) {
        self.inner.lock().await.refund_error = Some(error);
    }

    /// Delay every call by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        self.inner.lock().await.delay = Some(delay);
    }

    pub async fn last_create_request(&self) -> Option<CreateIntentRequest> {
        self.inner.lock().await.create_requests.last().cloned()
    }

    pub async fn last_confirm_request(&self) -> Option<ConfirmIntentRequest> {
        self.inner.lock().await.confirm_requests.last().cloned()
    }

    pub async fn last_refund_request(&self) -> Option<RefundRequest> {
        self.inner.lock().await.refund_requests.last().cloned()
    }

    pub async fn confirm_calls(&self) -> usize {
        self.inner.lock().await.confirm_requests.len()
    }

    pub async fn refund_calls(&self) -> usize {
        self.inner.lock().await.refund_requests.len()
    }

    async fn pause(&self) {
        let delay = self.inner.lock().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(&self, request: CreateIntentRequest) -> Result<GatewayIntent, GatewayError> {
        self.pause().await;
        let mut state = self.inner.lock().await;
        state.create_requests.push(request);
        if let Some(error) = state.create_error.take() {
            return Err(error);
        }

        state.next_intent += 1;
        let id = format!("pi_mock_{}", state.next_intent);
        let intent_id = IntentId::new(id.clone())
            .map_err(|e| GatewayError::invalid_request(e.to_string()))?;
        Ok(GatewayIntent {
            intent_id,
            client_secret: format!("{}_secret_mock", id),
            status: IntentStatus::RequiresPaymentMethod,
        })
    }

    async fn confirm_intent(&self, request: ConfirmIntentRequest) -> Result<ConfirmResult, GatewayError> {
        self.pause().await;
        let mut state = self.inner.lock().await;
        let payment_method = request.payment_method.clone();
        state.confirm_requests.push(request);
        if let Some(error) = state.confirm_error.take() {
            return Err(error);
        }

        Ok(ConfirmResult {
            status: state
                .confirm_status
                .clone()
                .unwrap_or(IntentStatus::Succeeded),
            payment_method: Some(payment_method),
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        self.pause().await;
        let mut state = self.inner.lock().await;
        state.refund_requests.push(request);
        if let Some(error) = state.refund_error.take() {
            return Err(error);
        }

        state.next_refund += 1;
        Ok(RefundResult {
            refund_id: format!("re_mock_{}", state.next_refund),
            status: state
                .refund_status
                .clone()
                .unwrap_or(RefundStatus::Succeeded),
        })
    }
}
