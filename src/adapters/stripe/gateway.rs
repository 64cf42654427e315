//! Stripe PaymentIntents adapter.
//!
//! Implements `PaymentGateway` over the Stripe REST API with form-encoded
//! requests. Every mutating call carries an `Idempotency-Key` header so a
//! retried request never charges or refunds twice.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret);
//! let gateway = StripeGateway::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::IntentId;
use crate::ports::{
    ConfirmIntentRequest, ConfirmResult, CreateIntentRequest, GatewayError, GatewayErrorCode,
    GatewayIntent, IntentStatus, PaymentGateway, RefundRequest, RefundResult, RefundStatus,
};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn webhook_secret(&self) -> &SecretString {
        &self.webhook_secret
    }
}

/// Stripe implementation of the `PaymentGateway` port.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
        idempotency_key: &str,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", idempotency_key)
            .form(params)
            .send()
            .await
            .map_err(|e| GatewayError::unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(path, status = status.as_u16(), error = %body, "Stripe request failed");
            return Err(map_error_response(status, &body));
        }

        response.json().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::InvalidRequest,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: CreateIntentRequest) -> Result<GatewayIntent, GatewayError> {
        let mut params = vec![
            ("amount".to_string(), request.amount.amount().to_string()),
            ("currency".to_string(), request.amount.currency().to_string()),
            ("description".to_string(), request.description.clone()),
        ];
        for (key, value) in &request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        let intent: StripePaymentIntent = self
            .post("/v1/payment_intents", &params, &request.idempotency_key)
            .await?;

        let client_secret = intent.client_secret.clone().ok_or_else(|| {
            GatewayError::new(
                GatewayErrorCode::InvalidRequest,
                format!("Intent {} came back without a client secret", intent.id),
            )
        })?;
        let intent_id = IntentId::new(intent.id.clone())
            .map_err(|e| GatewayError::new(GatewayErrorCode::InvalidRequest, e.to_string()))?;

        tracing::debug!(intent_id = %intent_id, "Stripe intent created");

        Ok(GatewayIntent {
            intent_id,
            client_secret,
            status: intent.intent_status(),
        })
    }

    async fn confirm_intent(&self, request: ConfirmIntentRequest) -> Result<ConfirmResult, GatewayError> {
        let params = vec![("payment_method".to_string(), request.payment_method.clone())];
        let path = format!("/v1/payment_intents/{}/confirm", request.intent_id);

        let intent: StripePaymentIntent = self
            .post(&path, &params, &request.idempotency_key)
            .await?;

        Ok(ConfirmResult {
            status: intent.intent_status(),
            payment_method: intent.payment_method,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        let mut params = vec![
            ("payment_intent".to_string(), request.intent_id.to_string()),
            ("amount".to_string(), request.amount.to_string()),
            ("reason".to_string(), "requested_by_customer".to_string()),
        ];
        if let Some(reason) = &request.reason {
            params.push(("metadata[reason]".to_string(), reason.clone()));
        }

        let refund: StripeRefund = self
            .post("/v1/refunds", &params, &request.idempotency_key)
            .await?;

        let status = match refund.status.as_str() {
            "succeeded" => RefundStatus::Succeeded,
            "pending" | "requires_action" => RefundStatus::Pending,
            "canceled" => RefundStatus::Canceled,
            _ => RefundStatus::Failed {
                reason: refund
                    .failure_reason
                    .unwrap_or_else(|| refund.status.clone()),
            },
        };

        Ok(RefundResult {
            refund_id: refund.id,
            status,
        })
    }
}

/// The fields of a Stripe PaymentIntent this adapter reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StripePaymentIntent {
    pub id: String,
    pub status: String,
    pub client_secret: Option<String>,
    pub payment_method: Option<String>,
    pub cancellation_reason: Option<String>,
    pub last_payment_error: Option<StripeErrorBody>,
}

impl StripePaymentIntent {
    fn intent_status(&self) -> IntentStatus {
        match self.status.as_str() {
            "succeeded" => IntentStatus::Succeeded,
            "requires_action" | "requires_confirmation" => IntentStatus::RequiresAction,
            "processing" | "requires_capture" => IntentStatus::Processing,
            "requires_payment_method" => match &self.last_payment_error {
                Some(err) => IntentStatus::Failed {
                    reason: err.reason(),
                },
                None => IntentStatus::RequiresPaymentMethod,
            },
            "canceled" => IntentStatus::Canceled {
                reason: self.cancellation_reason.clone(),
            },
            other => IntentStatus::Failed {
                reason: format!("unexpected intent status '{}'", other),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StripeRefund {
    id: String,
    status: String,
    failure_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StripeErrorBody {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub decline_code: Option<String>,
    pub message: Option<String>,
}

impl StripeErrorBody {
    /// Most specific reason available.
    pub fn reason(&self) -> String {
        self.decline_code
            .clone()
            .or_else(|| self.code.clone())
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "payment failed".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

/// 5xx and 429 are retryable; card errors are declines.
fn map_error_response(status: reqwest::StatusCode, body: &str) -> GatewayError {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return GatewayError::unavailable(format!("Stripe returned {}", status));
    }

    let parsed = serde_json::from_str::<StripeErrorEnvelope>(body).ok();
    let code = match (status, parsed.as_ref().and_then(|p| p.error.error_type.as_deref())) {
        (_, Some("card_error")) | (reqwest::StatusCode::PAYMENT_REQUIRED, _) => {
            GatewayErrorCode::Declined
        }
        (reqwest::StatusCode::UNAUTHORIZED, _) => GatewayErrorCode::Authentication,
        _ => GatewayErrorCode::InvalidRequest,
    };

    match parsed {
        Some(envelope) => {
            let message = match code {
                GatewayErrorCode::Declined => envelope.error.reason(),
                _ => envelope
                    .error
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Stripe returned {}", status)),
            };
            let error = GatewayError::new(code, message);
            match envelope.error.code {
                Some(provider_code) => error.with_provider_code(provider_code),
                None => error,
            }
        }
        None => GatewayError::new(code, format!("Stripe returned {}: {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn intent(status: &str) -> StripePaymentIntent {
        StripePaymentIntent {
            id: "pi_123".to_string(),
            status: status.to_string(),
            client_secret: Some("pi_123_secret_abc".to_string()),
            payment_method: Some("pm_1".to_string()),
            cancellation_reason: None,
            last_payment_error: None,
        }
    }

    #[test]
    fn config_new_sets_default_base_url() {
        let config = StripeConfig::new("sk_test", "whsec_test");
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        let config = config.with_base_url("http://localhost:12111");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    #[test]
    fn intent_statuses_map_to_port_statuses() {
        assert_eq!(intent("succeeded").intent_status(), IntentStatus::Succeeded);
        assert_eq!(intent("requires_action").intent_status(), IntentStatus::RequiresAction);
        assert_eq!(intent("processing").intent_status(), IntentStatus::Processing);
        assert_eq!(
            intent("requires_payment_method").intent_status(),
            IntentStatus::RequiresPaymentMethod
        );
    }

    #[test]
    fn failed_attempt_reports_decline_code() {
        let mut failed = intent("requires_payment_method");
        failed.last_payment_error = Some(StripeErrorBody {
            error_type: Some("card_error".to_string()),
            code: Some("card_declined".to_string()),
            decline_code: Some("insufficient_funds".to_string()),
            message: Some("Your card has insufficient funds.".to_string()),
        });

        assert_eq!(
            failed.intent_status(),
            IntentStatus::Failed {
                reason: "insufficient_funds".to_string()
            }
        );
    }

    #[test]
    fn server_errors_are_unavailable() {
        let err = map_error_response(StatusCode::BAD_GATEWAY, "");
        assert!(err.is_retryable());
        let err = map_error_response(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(err.is_retryable());
    }

    #[test]
    fn card_errors_are_declines() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","decline_code":"generic_decline","message":"Your card was declined."}}"#;
        let err = map_error_response(StatusCode::PAYMENT_REQUIRED, body);
        assert_eq!(err.code, GatewayErrorCode::Declined);
        assert_eq!(err.message, "generic_decline");
        assert_eq!(err.provider_code.as_deref(), Some("card_declined"));
    }

    #[test]
    fn bad_key_is_authentication_error() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"Invalid API Key provided"}}"#;
        let err = map_error_response(StatusCode::UNAUTHORIZED, body);
        assert_eq!(err.code, GatewayErrorCode::Authentication);
        assert!(!err.is_retryable());
    }
}
