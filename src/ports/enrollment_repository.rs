//! Enrollment repository port.
//!
//! Implementations must enforce uniqueness of (user_id, course_id) at the
//! store level. Concurrent inserts for the same pair must leave exactly one
//! row, and every loser gets `InsertResult::AlreadyExists` with the winner.

use crate::domain::enrollment::{Enrollment, LessonProgress};
use crate::domain::foundation::{CourseId, DomainError, EnrollmentId, LessonId, UserId};
use async_trait::async_trait;

use super::UpdateResult;

/// Result of inserting an enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// This call created the row.
    Inserted,

    /// A row for the pair already existed; here it is.
    AlreadyExists(Enrollment),
}

/// Repository port for Enrollment persistence.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert unless an enrollment for the pair exists.
    async fn insert(&self, enrollment: &Enrollment) -> Result<InsertResult, DomainError>;

    /// Write `enrollment` if the stored version equals `enrollment.version`.
    async fn update(&self, enrollment: &Enrollment) -> Result<UpdateResult, DomainError>;

    async fn find_by_id(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, DomainError>;

    async fn find_by_pair(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, DomainError>;

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, DomainError>;

    /// Insert or overwrite one lesson's progress.
    async fn save_lesson_progress(&self, progress: &LessonProgress) -> Result<(), DomainError>;

    async fn find_lesson_progress(
        &self,
        enrollment_id: &EnrollmentId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, DomainError>;

    async fn list_lesson_progress(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Vec<LessonProgress>, DomainError>;
}
