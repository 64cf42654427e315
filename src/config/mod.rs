//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `EDUMASTER` prefix and
//! nested values are separated with a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use edumaster_access::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! println!("Listening on {}:{}", config.server.host, config.server.port);
//! ```

mod database;
mod enrollment;
mod error;
mod logging;
mod payment;
mod reconciler;
mod server;

pub use database::DatabaseConfig;
pub use enrollment::EnrollmentConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use payment::{GatewayProvider, PaymentConfig};
pub use reconciler::ReconcilerConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Listen address and request timeout
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection; in-memory stores when absent
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Gateway credentials, currency and timeouts
    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    #[serde(default)]
    pub enrollment: EnrollmentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate configuration.
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `EDUMASTER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Validates every section
    ///
    /// # Environment Variable Format
    ///
    /// - `EDUMASTER__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `EDUMASTER__PAYMENT__STRIPE_API_KEY=...` -> `payment.stripe_api_key = ...`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: AppConfig = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("EDUMASTER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.reconciler.validate()?;
        self.enrollment.validate()?;
        Ok(())
    }
}
