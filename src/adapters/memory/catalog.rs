//! In-memory CourseCatalog.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::course::CourseListing;
use crate::domain::foundation::{CourseId, DomainError};
use crate::ports::CourseCatalog;

#[derive(Default)]
pub struct InMemoryCourseCatalog {
    courses: RwLock<HashMap<CourseId, CourseListing>>,
}

impl InMemoryCourseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, course: CourseListing) {
        self.courses.write().await.insert(course.id, course);
    }
}

#[async_trait]
impl CourseCatalog for InMemoryCourseCatalog {
    async fn find_course(&self, course_id: &CourseId) -> Result<Option<CourseListing>, DomainError> {
        Ok(self.courses.read().await.get(course_id).cloned())
    }
}
