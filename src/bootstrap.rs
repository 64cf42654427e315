//! Composition root helpers.
//!
//! Wires ports to adapters and services to each other. `main.rs` uses these
//! with configuration; integration tests use them with in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::http::AppState;
use crate::adapters::memory::{
    InMemoryCourseCatalog, InMemoryEnrollmentRepository, InMemoryPaymentRecordRepository,
    InMemoryWebhookEventLog,
};
use crate::adapters::postgres::{
    PostgresCourseCatalog, PostgresEnrollmentRepository, PostgresPaymentRecordRepository,
    PostgresWebhookEventLog,
};
use crate::adapters::stripe::{MockPaymentGateway, StripeConfig, StripeGateway, StripeWebhookVerifier};
use crate::application::{
    EnrollmentManager, Notifier, PaymentOrchestrator, PaymentTransitions, RetryPolicy,
    WebhookReconciler,
};
use crate::config::{AppConfig, DatabaseConfig, GatewayProvider, LoggingConfig, PaymentConfig, ValidationError};
use crate::domain::foundation::Currency;
use crate::ports::{
    CourseCatalog, EnrollmentRepository, NotificationSink, PaymentGateway,
    PaymentRecordRepository, WebhookEventLog,
};

/// Upper bound on a single notification delivery.
pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Persistence ports, backed either by PostgreSQL or by memory.
#[derive(Clone)]
pub struct Stores {
    pub payments: Arc<dyn PaymentRecordRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub catalog: Arc<dyn CourseCatalog>,
    pub webhook_log: Arc<dyn WebhookEventLog>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            payments: Arc::new(PostgresPaymentRecordRepository::new(pool.clone())),
            enrollments: Arc::new(PostgresEnrollmentRepository::new(pool.clone())),
            catalog: Arc::new(PostgresCourseCatalog::new(pool.clone())),
            webhook_log: Arc::new(PostgresWebhookEventLog::new(pool)),
        }
    }

    /// Memory stores around the given catalog, so callers can seed courses.
    pub fn in_memory(catalog: Arc<InMemoryCourseCatalog>) -> Self {
        Self {
            payments: Arc::new(InMemoryPaymentRecordRepository::new()),
            enrollments: Arc::new(InMemoryEnrollmentRepository::new()),
            catalog,
            webhook_log: Arc::new(InMemoryWebhookEventLog::new()),
        }
    }
}

/// Connect to PostgreSQL and apply migrations when enabled.
pub async fn connect_postgres(config: &DatabaseConfig, url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(url)
        .await?;

    if config.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations complete");
    }

    Ok(pool)
}

/// Gateway adapter selected by configuration.
pub fn payment_gateway(config: &PaymentConfig) -> Arc<dyn PaymentGateway> {
    match config.provider {
        GatewayProvider::Stripe => {
            let stripe = StripeConfig::new(
                config.stripe_api_key.expose_secret().clone(),
                config.stripe_webhook_secret.expose_secret().clone(),
            )
            .with_base_url(config.api_base_url.clone());
            Arc::new(StripeGateway::new(stripe))
        }
        GatewayProvider::Mock => {
            tracing::warn!("Using the mock payment gateway; no real charges are made");
            Arc::new(MockPaymentGateway::new())
        }
    }
}

/// Tunables for the application services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub currency: Currency,
    pub gateway_timeout: Duration,
    pub max_conflict_retries: u32,
    pub retry_policy: RetryPolicy,
    pub notification_timeout: Duration,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            currency: config.payment.currency()?,
            gateway_timeout: config.payment.gateway_timeout(),
            max_conflict_retries: config.enrollment.max_conflict_retries,
            retry_policy: config.reconciler.retry_policy(),
            notification_timeout: NOTIFICATION_TIMEOUT,
        })
    }
}

/// The wired application services.
#[derive(Clone)]
pub struct Services {
    pub enrollments: Arc<EnrollmentManager>,
    pub transitions: Arc<PaymentTransitions>,
    pub payments: Arc<PaymentOrchestrator>,
    pub reconciler: Arc<WebhookReconciler>,
}

impl Services {
    pub fn new(
        stores: &Stores,
        gateway: Arc<dyn PaymentGateway>,
        sink: Arc<dyn NotificationSink>,
        settings: &ServiceSettings,
    ) -> Self {
        let notifier = Notifier::new(sink, settings.notification_timeout);

        let enrollments = Arc::new(EnrollmentManager::new(
            stores.enrollments.clone(),
            stores.payments.clone(),
            stores.catalog.clone(),
            notifier.clone(),
            settings.max_conflict_retries,
        ));
        let transitions = Arc::new(PaymentTransitions::new(
            stores.payments.clone(),
            enrollments.clone(),
            notifier,
            settings.max_conflict_retries,
        ));
        let payments = Arc::new(PaymentOrchestrator::new(
            stores.payments.clone(),
            stores.catalog.clone(),
            gateway,
            enrollments.clone(),
            transitions.clone(),
            settings.currency.clone(),
            settings.gateway_timeout,
        ));
        let reconciler = Arc::new(WebhookReconciler::new(
            stores.payments.clone(),
            transitions.clone(),
            stores.webhook_log.clone(),
            settings.retry_policy.clone(),
        ));

        Self {
            enrollments,
            transitions,
            payments,
            reconciler,
        }
    }

    pub fn app_state(&self, verifier: StripeWebhookVerifier) -> AppState {
        AppState {
            payments: self.payments.clone(),
            enrollments: self.enrollments.clone(),
            reconciler: self.reconciler.clone(),
            webhook_verifier: Arc::new(verifier),
        }
    }
}

/// Webhook verifier from payment configuration.
pub fn webhook_verifier(config: &PaymentConfig) -> StripeWebhookVerifier {
    let secret = SecretString::new(config.stripe_webhook_secret.expose_secret().clone());
    StripeWebhookVerifier::new(secret)
        .with_tolerance_secs(config.webhook_tolerance_secs)
        .with_require_livemode(config.require_livemode)
}
