//! In-memory EnrollmentRepository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::enrollment::{Enrollment, LessonProgress};
use crate::domain::foundation::{CourseId, DomainError, EnrollmentId, ErrorCode, LessonId, UserId};
use crate::ports::{EnrollmentRepository, InsertResult, UpdateResult};

#[derive(Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: RwLock<HashMap<EnrollmentId, Enrollment>>,
    lessons: RwLock<HashMap<(EnrollmentId, LessonId), LessonProgress>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrollments stored for the pair. Never more than one.
    pub async fn count_for_pair(&self, user_id: &UserId, course_id: &CourseId) -> usize {
        self.enrollments
            .read()
            .await
            .values()
            .filter(|e| &e.user_id == user_id && &e.course_id == course_id)
            .count()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn insert(&self, enrollment: &Enrollment) -> Result<InsertResult, DomainError> {
        let mut enrollments = self.enrollments.write().await;
        if let Some(existing) = enrollments
            .values()
            .find(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id)
        {
            return Ok(InsertResult::AlreadyExists(existing.clone()));
        }
        enrollments.insert(enrollment.id, enrollment.clone());
        Ok(InsertResult::Inserted)
    }

    async fn update(&self, enrollment: &Enrollment) -> Result<UpdateResult, DomainError> {
        let mut enrollments = self.enrollments.write().await;
        let stored = enrollments.get(&enrollment.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::EnrollmentNotFound,
                format!("Enrollment not found: {}", enrollment.id),
            )
        })?;
        if stored.version != enrollment.version {
            return Ok(UpdateResult::VersionConflict);
        }

        let mut next = enrollment.clone();
        next.version += 1;
        enrollments.insert(enrollment.id, next);
        Ok(UpdateResult::Updated)
    }

    async fn find_by_id(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, DomainError> {
        Ok(self.enrollments.read().await.get(id).cloned())
    }

    async fn find_by_pair(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, DomainError> {
        Ok(self
            .enrollments
            .read()
            .await
            .values()
            .find(|e| &e.user_id == user_id && &e.course_id == course_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, DomainError> {
        let mut list: Vec<Enrollment> = self
            .enrollments
            .read()
            .await
            .values()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(list)
    }

    async fn save_lesson_progress(&self, progress: &LessonProgress) -> Result<(), DomainError> {
        self.lessons
            .write()
            .await
            .insert((progress.enrollment_id, progress.lesson_id), progress.clone());
        Ok(())
    }

    async fn find_lesson_progress(
        &self,
        enrollment_id: &EnrollmentId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, DomainError> {
        Ok(self
            .lessons
            .read()
            .await
            .get(&(*enrollment_id, *lesson_id))
            .cloned())
    }

    async fn list_lesson_progress(&self, enrollment_id: &EnrollmentId) -> Result<Vec<LessonProgress>, DomainError> {
        Ok(self
            .lessons
            .read()
            .await
            .values()
            .filter(|l| &l.enrollment_id == enrollment_id)
            .cloned()
            .collect())
    }
}
