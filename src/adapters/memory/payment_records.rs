//! In-memory PaymentRecordRepository.
//!
//! Enforces the same constraints as the postgres tables: unique intent id,
//! compare-and-set on `version`, and at most one SUCCEEDED record per
//! (user, course). All checks run under one write lock.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{CourseId, DomainError, ErrorCode, IntentId, PaymentId, UserId};
use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::ports::{PaymentRecordRepository, UpdateResult};

#[derive(Default)]
pub struct InMemoryPaymentRecordRepository {
    records: RwLock<HashMap<PaymentId, PaymentRecord>>,
}

impl InMemoryPaymentRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records. Test helper.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentRecordRepository for InMemoryPaymentRecordRepository {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(DomainError::validation("id", "Payment id already recorded"));
        }
        if records.values().any(|r| r.intent_id == record.intent_id) {
            return Err(DomainError::validation(
                "intent_id",
                format!("Intent {} already recorded", record.intent_id),
            ));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update(&self, record: &PaymentRecord) -> Result<UpdateResult, DomainError> {
        let mut records = self.records.write().await;

        let stored_version = records
            .get(&record.id)
            .map(|r| r.version)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::PaymentNotFound,
                    format!("Payment not found: {}", record.id),
                )
            })?;
        if stored_version != record.version {
            return Ok(UpdateResult::VersionConflict);
        }

        if record.status == PaymentStatus::Succeeded
            && records.values().any(|r| {
                r.id != record.id
                    && r.user_id == record.user_id
                    && r.course_id == record.course_id
                    && r.status == PaymentStatus::Succeeded
            })
        {
            return Err(DomainError::new(
                ErrorCode::DuplicatePurchase,
                format!(
                    "User {} already holds a succeeded payment for course {}",
                    record.user_id, record.course_id
                ),
            ));
        }

        let mut next = record.clone();
        next.version += 1;
        records.insert(record.id, next);
        Ok(UpdateResult::Updated)
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn find_by_intent_id(&self, intent_id: &IntentId) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| &r.intent_id == intent_id)
            .cloned())
    }

    async fn find_succeeded(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| {
                &r.user_id == user_id
                    && &r.course_id == course_id
                    && r.status == PaymentStatus::Succeeded
            })
            .cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, DomainError> {
        let mut list: Vec<PaymentRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}
