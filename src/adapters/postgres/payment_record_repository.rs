//! PostgreSQL implementation of PaymentRecordRepository.
//!
//! Compare-and-set runs in the `UPDATE ... WHERE version = $n` clause. The
//! one-success-per-pair rule is the partial unique index
//! `payment_records_one_success_per_pair`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CourseId, Currency, DomainError, ErrorCode, IntentId, Money, PaymentId, Timestamp, UserId,
};
use crate::domain::payment::{PaymentRecord, PaymentStatus, RefundEntry};
use crate::ports::{PaymentRecordRepository, UpdateResult};

const SELECT_COLUMNS: &str = r#"
    SELECT id, intent_id, user_id, course_id, amount_minor, currency, status,
           refunded_amount, refund_reason, refunds, payment_method, failure_reason,
           created_at, updated_at, paid_at, refunded_at, version
    FROM payment_records
"#;

pub struct PostgresPaymentRecordRepository {
    pool: PgPool,
}

impl PostgresPaymentRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment record.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRecordRow {
    id: Uuid,
    intent_id: String,
    user_id: String,
    course_id: Uuid,
    amount_minor: i64,
    currency: String,
    status: String,
    refunded_amount: i64,
    refund_reason: Option<String>,
    refunds: Json<Vec<RefundEntry>>,
    payment_method: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<PaymentRecordRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRecordRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: String| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", field, e))
        };

        let currency = Currency::new(row.currency.trim()).map_err(|e| corrupt("currency", e.to_string()))?;
        Ok(PaymentRecord {
            id: PaymentId::from_uuid(row.id),
            intent_id: IntentId::new(row.intent_id).map_err(|e| corrupt("intent_id", e.to_string()))?,
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("user_id", e.to_string()))?,
            course_id: CourseId::from_uuid(row.course_id),
            amount: Money::new(row.amount_minor, currency).map_err(|e| corrupt("amount", e.to_string()))?,
            status: row.status.parse::<PaymentStatus>().map_err(|e| corrupt("status", e))?,
            refunded_amount: row.refunded_amount,
            refund_reason: row.refund_reason,
            refunds: row.refunds.0,
            payment_method: row.payment_method,
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            refunded_at: row.refunded_at.map(Timestamp::from_datetime),
            version: row.version,
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn violated_constraint(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl PaymentRecordRepository for PostgresPaymentRecordRepository {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_records (
                id, intent_id, user_id, course_id, amount_minor, currency, status,
                refunded_amount, refund_reason, refunds, payment_method, failure_reason,
                created_at, updated_at, paid_at, refunded_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.intent_id.as_str())
        .bind(record.user_id.as_str())
        .bind(record.course_id.as_uuid())
        .bind(record.amount.amount())
        .bind(record.amount.currency().as_str())
        .bind(record.status.as_str())
        .bind(record.refunded_amount)
        .bind(&record.refund_reason)
        .bind(Json(&record.refunds))
        .bind(&record.payment_method)
        .bind(&record.failure_reason)
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .bind(record.paid_at.as_ref().map(|t| *t.as_datetime()))
        .bind(record.refunded_at.as_ref().map(|t| *t.as_datetime()))
        .bind(record.version)
        .execute(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e).as_deref() {
            Some("payment_records_intent_id_key") => DomainError::validation(
                "intent_id",
                format!("Intent {} already recorded", record.intent_id),
            ),
            _ => db_error("Failed to insert payment record", e),
        })?;

        Ok(())
    }

    async fn update(&self, record: &PaymentRecord) -> Result<UpdateResult, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_records SET
                status = $3,
                refunded_amount = $4,
                refund_reason = $5,
                refunds = $6,
                payment_method = $7,
                failure_reason = $8,
                updated_at = $9,
                paid_at = $10,
                refunded_at = $11,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.version)
        .bind(record.status.as_str())
        .bind(record.refunded_amount)
        .bind(&record.refund_reason)
        .bind(Json(&record.refunds))
        .bind(&record.payment_method)
        .bind(&record.failure_reason)
        .bind(record.updated_at.as_datetime())
        .bind(record.paid_at.as_ref().map(|t| *t.as_datetime()))
        .bind(record.refunded_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e).as_deref() {
            Some("payment_records_one_success_per_pair") => DomainError::new(
                ErrorCode::DuplicatePurchase,
                format!(
                    "User {} already holds a succeeded payment for course {}",
                    record.user_id, record.course_id
                ),
            ),
            _ => db_error("Failed to update payment record", e),
        })?;

        if result.rows_affected() == 1 {
            return Ok(UpdateResult::Updated);
        }

        // Zero rows: either a stale version or a missing record.
        let exists: Option<(i64,)> = sqlx::query_as("SELECT version FROM payment_records WHERE id = $1")
            .bind(record.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check payment record", e))?;

        match exists {
            Some(_) => Ok(UpdateResult::VersionConflict),
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment not found: {}", record.id),
            )),
        }
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRecordRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find payment record", e))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn find_by_intent_id(&self, intent_id: &IntentId) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRecordRow> =
            sqlx::query_as(&format!("{} WHERE intent_id = $1", SELECT_COLUMNS))
                .bind(intent_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find payment record", e))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn find_succeeded(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRecordRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 AND course_id = $2 AND status = 'succeeded'",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(course_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find succeeded payment", e))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, DomainError> {
        let rows: Vec<PaymentRecordRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list payment records", e))?;

        rows.into_iter().map(PaymentRecord::try_from).collect()
    }
}
