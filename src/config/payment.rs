//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::stripe::DEFAULT_TOLERANCE_SECS;
use crate::domain::foundation::Currency;

/// Which gateway implementation backs the `PaymentGateway` port.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    #[default]
    Stripe,
    /// In-process gateway that approves everything. Local runs only.
    Mock,
}

/// Payment configuration (Stripe)
#[derive(Debug, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub provider: GatewayProvider,

    /// Stripe secret API key
    #[serde(default = "empty_secret")]
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    #[serde(default = "empty_secret")]
    pub stripe_webhook_secret: SecretString,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// ISO 4217 code every intent is created in
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Maximum age of a webhook signature timestamp
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    /// Reject test-mode events
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    pub fn currency(&self) -> Result<Currency, ValidationError> {
        Currency::new(&self.currency).map_err(|_| ValidationError::InvalidCurrency(self.currency.clone()))
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let webhook_secret = self.stripe_webhook_secret.expose_secret();
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if self.provider == GatewayProvider::Stripe {
            let api_key = self.stripe_api_key.expose_secret();
            if api_key.is_empty() {
                return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
            }
            if !api_key.starts_with("sk_") {
                return Err(ValidationError::InvalidStripeKey);
            }
        }

        self.currency()?;
        if self.gateway_timeout_secs == 0 || self.gateway_timeout_secs > 120 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if self.webhook_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            provider: GatewayProvider::default(),
            stripe_api_key: empty_secret(),
            stripe_webhook_secret: empty_secret(),
            api_base_url: default_api_base_url(),
            currency: default_currency(),
            gateway_timeout_secs: default_gateway_timeout(),
            webhook_tolerance_secs: default_webhook_tolerance(),
            require_livemode: false,
        }
    }
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_webhook_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}
