//! Read-only course lookup.

use crate::domain::course::CourseListing;
use crate::domain::foundation::{CourseId, DomainError};
use async_trait::async_trait;

/// Port for reading course purchasability.
///
/// Reads are treated as synchronous and consistent.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn find_course(&self, course_id: &CourseId) -> Result<Option<CourseListing>, DomainError>;
}
