//! EduMaster access service.
//!
//! Loads configuration, connects storage, wires the services and serves the
//! REST API until Ctrl+C.

use std::sync::Arc;

use edumaster_access::adapters::http::{api_router, with_middleware};
use edumaster_access::adapters::memory::InMemoryCourseCatalog;
use edumaster_access::adapters::notification::TracingNotificationSink;
use edumaster_access::bootstrap::{
    connect_postgres, init_tracing, payment_gateway, webhook_verifier, ServiceSettings, Services,
    Stores,
};
use edumaster_access::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    tracing::info!(
        port = config.server.port,
        currency = %config.payment.currency,
        provider = ?config.payment.provider,
        "Configuration loaded"
    );

    // 1. Storage
    let stores = match config.database.postgres_url() {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL");
            let pool = connect_postgres(&config.database, url).await?;
            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("No database configured; using in-memory stores");
            Stores::in_memory(Arc::new(InMemoryCourseCatalog::new()))
        }
    };

    // 2. Services
    let settings = ServiceSettings::from_config(&config)?;
    let services = Services::new(
        &stores,
        payment_gateway(&config.payment),
        Arc::new(TracingNotificationSink::new()),
        &settings,
    );
    let state = services.app_state(webhook_verifier(&config.payment));

    // 3. HTTP
    let app = with_middleware(api_router(state), config.server.request_timeout());
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down gracefully...");
        })
        .await?;

    Ok(())
}
