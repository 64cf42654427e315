//! PostgreSQL implementation of WebhookEventLog.
//!
//! Redeliveries of the same event overwrite the earlier entry, so the row
//! always carries the latest outcome.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{WebhookEventEntry, WebhookEventLog, WebhookOutcome};

pub struct PostgresWebhookEventLog {
    pool: PgPool,
}

impl PostgresWebhookEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    event_id: String,
    event_type: String,
    intent_id: String,
    outcome: String,
    attempts: i32,
    error_message: Option<String>,
    payload: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<WebhookEventRow> for WebhookEventEntry {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let outcome = row.outcome.parse::<WebhookOutcome>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid outcome: {}", e))
        })?;

        Ok(WebhookEventEntry {
            event_id: row.event_id,
            event_type: row.event_type,
            intent_id: row.intent_id,
            outcome,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            error_message: row.error_message,
            payload: row.payload,
            recorded_at: row.recorded_at,
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl WebhookEventLog for PostgresWebhookEventLog {
    async fn record(&self, entry: WebhookEventEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_events (
                event_id, event_type, intent_id, outcome, attempts, error_message, payload, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_id) DO UPDATE SET
                outcome = EXCLUDED.outcome,
                attempts = EXCLUDED.attempts,
                error_message = EXCLUDED.error_message,
                recorded_at = EXCLUDED.recorded_at
            "#,
        )
        .bind(&entry.event_id)
        .bind(&entry.event_type)
        .bind(&entry.intent_id)
        .bind(entry.outcome.as_str())
        .bind(i32::try_from(entry.attempts).unwrap_or(i32::MAX))
        .bind(&entry.error_message)
        .bind(&entry.payload)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record webhook event", e))?;

        Ok(())
    }

    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEventEntry>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, intent_id, outcome, attempts, error_message, payload, recorded_at
            FROM webhook_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find webhook event", e))?;

        row.map(WebhookEventEntry::try_from).transpose()
    }

    async fn list_dead_letters(&self, limit: u32) -> Result<Vec<WebhookEventEntry>, DomainError> {
        let rows: Vec<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, intent_id, outcome, attempts, error_message, payload, recorded_at
            FROM webhook_events
            WHERE outcome = 'dead_lettered'
            ORDER BY recorded_at DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list dead letters", e))?;

        rows.into_iter().map(WebhookEventEntry::try_from).collect()
    }
}
