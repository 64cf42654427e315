//! PaymentRecord repository port.
//!
//! # Design
//!
//! - **Append-only history**: records are inserted once and never deleted
//! - **Compare-and-set updates**: `update` only writes when the stored
//!   version still equals `record.version`
//! - **Unique intent id**: one record per gateway intent
//! - **One success per pair**: at most one SUCCEEDED record per
//!   (user, course); an update that would create a second fails with
//!   `ErrorCode::DuplicatePurchase`

use crate::domain::foundation::{CourseId, DomainError, IntentId, PaymentId, UserId};
use crate::domain::payment::PaymentRecord;
use async_trait::async_trait;

use super::UpdateResult;

/// Repository port for PaymentRecord persistence.
#[async_trait]
pub trait PaymentRecordRepository: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the intent id is already recorded
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, record: &PaymentRecord) -> Result<(), DomainError>;

    /// Write `record` if the stored version equals `record.version`.
    ///
    /// On `Updated` the stored version is `record.version + 1`.
    ///
    /// # Errors
    ///
    /// - `DuplicatePurchase` if another record for the pair already succeeded
    /// - `DatabaseError` on persistence failure
    async fn update(&self, record: &PaymentRecord) -> Result<UpdateResult, DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError>;

    async fn find_by_intent_id(&self, intent_id: &IntentId) -> Result<Option<PaymentRecord>, DomainError>;

    /// The SUCCEEDED record for the pair, if any.
    ///
    /// Fully refunded records are not returned.
    async fn find_succeeded(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// All records of a user, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<PaymentRecord>, DomainError>;
}
