//! EnrollmentManager - owns the enrollment and course-progress state machines.
//!
//! Invoked by the payment side on every convergence to SUCCEEDED and
//! directly by callers for free courses and progress updates.

use std::sync::Arc;

use crate::domain::course::CourseListing;
use crate::domain::enrollment::{
    aggregate_progress, Enrollment, EnrollmentError, LessonProgress, ProgressChange,
};
use crate::domain::foundation::{CourseId, EnrollmentId, LessonId, Percentage, UserId};
use crate::application::Notifier;
use crate::ports::{
    CourseCatalog, EnrollmentRepository, InsertResult, Notification, NotificationKind,
    PaymentRecordRepository, UpdateResult,
};

/// Command to enroll a user in a course.
#[derive(Debug, Clone)]
pub struct EnrollCommand {
    pub user_id: UserId,
    pub course_id: CourseId,
}

/// Result of an enroll call.
#[derive(Debug, Clone)]
pub struct EnrollResult {
    pub enrollment: Enrollment,

    /// False when the enrollment already existed.
    pub created: bool,
}

/// Command to set the overall progress of an enrollment.
#[derive(Debug, Clone)]
pub struct UpdateProgressCommand {
    pub enrollment_id: EnrollmentId,

    /// Unchecked input; must be within 0..=100.
    pub percentage: i64,
}

/// Command to record progress on a single lesson.
#[derive(Debug, Clone)]
pub struct RecordLessonProgressCommand {
    pub enrollment_id: EnrollmentId,
    pub lesson_id: LessonId,
    pub watch_seconds: u32,
    pub completed: bool,
}

/// Handler for enrollment and progress operations.
pub struct EnrollmentManager {
    enrollments: Arc<dyn EnrollmentRepository>,
    payments: Arc<dyn PaymentRecordRepository>,
    catalog: Arc<dyn CourseCatalog>,
    notifier: Notifier,
    max_conflict_retries: u32,
}

impl EnrollmentManager {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        payments: Arc<dyn PaymentRecordRepository>,
        catalog: Arc<dyn CourseCatalog>,
        notifier: Notifier,
        max_conflict_retries: u32,
    ) -> Self {
        Self {
            enrollments,
            payments,
            catalog,
            notifier,
            max_conflict_retries,
        }
    }

    /// Enrolls a user, idempotently.
    ///
    /// An existing enrollment for the pair is returned unchanged. A fresh one
    /// requires a free published course or a SUCCEEDED payment for the pair.
    pub async fn enroll(&self, cmd: EnrollCommand) -> Result<EnrollResult, EnrollmentError> {
        // 1. Existing enrollment wins
        if let Some(existing) = self
            .enrollments
            .find_by_pair(&cmd.user_id, &cmd.course_id)
            .await?
        {
            return Ok(EnrollResult {
                enrollment: existing,
                created: false,
            });
        }

        // 2. Authorize access
        self.authorize(&cmd.user_id, &cmd.course_id).await?;

        // 3. Insert; the store's uniqueness constraint settles races
        let enrollment = Enrollment::new(EnrollmentId::new(), cmd.user_id.clone(), cmd.course_id);
        match self.enrollments.insert(&enrollment).await? {
            InsertResult::Inserted => {
                tracing::info!(
                    enrollment_id = %enrollment.id,
                    user_id = %enrollment.user_id,
                    course_id = %enrollment.course_id,
                    "User enrolled"
                );

                // 4. Notify
                self.notifier
                    .send(Notification::new(
                        enrollment.user_id.clone(),
                        NotificationKind::Enrolled,
                        serde_json::json!({
                            "enrollment_id": enrollment.id,
                            "course_id": enrollment.course_id,
                        }),
                    ))
                    .await;

                Ok(EnrollResult {
                    enrollment,
                    created: true,
                })
            }
            InsertResult::AlreadyExists(existing) => {
                tracing::debug!(
                    enrollment_id = %existing.id,
                    user_id = %existing.user_id,
                    course_id = %existing.course_id,
                    "Concurrent enroll lost the race, returning existing enrollment"
                );
                Ok(EnrollResult {
                    enrollment: existing,
                    created: false,
                })
            }
        }
    }

    /// Sets overall progress. Reaching 100 completes the course and notifies once.
    pub async fn update_progress(&self, cmd: UpdateProgressCommand) -> Result<Enrollment, EnrollmentError> {
        let percentage = Percentage::try_new(cmd.percentage)?;
        self.apply_progress(&cmd.enrollment_id, |_| percentage).await
    }

    /// Completes the course regardless of lesson progress.
    pub async fn mark_completed(&self, enrollment_id: &EnrollmentId) -> Result<Enrollment, EnrollmentError> {
        self.apply_progress(enrollment_id, |_| Percentage::HUNDRED).await
    }

    /// Records one lesson's progress and re-aggregates the enrollment.
    ///
    /// The aggregated percentage never lowers progress recorded earlier.
    pub async fn record_lesson_progress(
        &self,
        cmd: RecordLessonProgressCommand,
    ) -> Result<Enrollment, EnrollmentError> {
        let enrollment = self.get(&cmd.enrollment_id).await?;
        let course = self.course(&enrollment.course_id).await?;

        let mut lesson = self
            .enrollments
            .find_lesson_progress(&cmd.enrollment_id, &cmd.lesson_id)
            .await?
            .unwrap_or_else(|| LessonProgress::new(cmd.enrollment_id, cmd.lesson_id));
        lesson.record(cmd.watch_seconds, cmd.completed);
        self.enrollments.save_lesson_progress(&lesson).await?;

        let lessons = self.enrollments.list_lesson_progress(&cmd.enrollment_id).await?;
        let aggregated = aggregate_progress(&lessons, course.total_lessons);

        tracing::debug!(
            enrollment_id = %cmd.enrollment_id,
            lesson_id = %cmd.lesson_id,
            aggregated = aggregated.value(),
            "Lesson progress recorded"
        );

        self.apply_progress(&cmd.enrollment_id, |current| current.max(aggregated))
            .await
    }

    pub async fn find(&self, enrollment_id: &EnrollmentId) -> Result<Enrollment, EnrollmentError> {
        self.get(enrollment_id).await
    }

    pub async fn is_enrolled(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, EnrollmentError> {
        Ok(self
            .enrollments
            .find_by_pair(user_id, course_id)
            .await?
            .is_some())
    }

    /// True if the user is enrolled or the course is free and published.
    pub async fn can_access(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, EnrollmentError> {
        if self.is_enrolled(user_id, course_id).await? {
            return Ok(true);
        }
        Ok(self
            .catalog
            .find_course(course_id)
            .await?
            .map(|c| c.is_open_enrollment())
            .unwrap_or(false))
    }

    pub async fn enrollments_for_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, EnrollmentError> {
        Ok(self.enrollments.list_by_user(user_id).await?)
    }

    async fn authorize(&self, user_id: &UserId, course_id: &CourseId) -> Result<(), EnrollmentError> {
        if self.payments.find_succeeded(user_id, course_id).await?.is_some() {
            return Ok(());
        }

        let course = self.course(course_id).await?;
        if course.is_open_enrollment() {
            return Ok(());
        }
        if course.is_free() {
            return Err(EnrollmentError::CourseNotOpen {
                course_id: *course_id,
                reason: "course is not published".to_string(),
            });
        }
        Err(EnrollmentError::PaymentRequired {
            user_id: user_id.clone(),
            course_id: *course_id,
        })
    }

    async fn course(&self, course_id: &CourseId) -> Result<CourseListing, EnrollmentError> {
        self.catalog
            .find_course(course_id)
            .await?
            .ok_or(EnrollmentError::CourseNotFound(*course_id))
    }

    async fn get(&self, enrollment_id: &EnrollmentId) -> Result<Enrollment, EnrollmentError> {
        self.enrollments
            .find_by_id(enrollment_id)
            .await?
            .ok_or(EnrollmentError::NotFound(*enrollment_id))
    }

    /// Compare-and-set loop for progress changes.
    ///
    /// `target` gets the current percentage and returns the new one; it is
    /// re-evaluated against fresh state after every version conflict. The
    /// completion notification fires only from the write that completed.
    async fn apply_progress<F>(&self, enrollment_id: &EnrollmentId, target: F) -> Result<Enrollment, EnrollmentError>
    where
        F: Fn(Percentage) -> Percentage,
    {
        for attempt in 0..=self.max_conflict_retries {
            let mut enrollment = self.get(enrollment_id).await?;
            let change = enrollment.record_progress(target(enrollment.progress))?;
            if !change.is_change() {
                return Ok(enrollment);
            }

            match self.enrollments.update(&enrollment).await? {
                UpdateResult::Updated => {
                    enrollment.version += 1;
                    tracing::info!(
                        enrollment_id = %enrollment.id,
                        status = %enrollment.status,
                        progress = enrollment.progress.value(),
                        "Enrollment progress updated"
                    );

                    if let ProgressChange::Completed { .. } = change {
                        self.notifier
                            .send(Notification::new(
                                enrollment.user_id.clone(),
                                NotificationKind::CourseCompleted,
                                serde_json::json!({
                                    "enrollment_id": enrollment.id,
                                    "course_id": enrollment.course_id,
                                    "completed_at": enrollment.completed_at,
                                }),
                            ))
                            .await;
                    }
                    return Ok(enrollment);
                }
                UpdateResult::VersionConflict => {
                    tracing::debug!(
                        enrollment_id = %enrollment_id,
                        attempt,
                        "Enrollment version conflict, reloading"
                    );
                }
            }
        }

        Err(EnrollmentError::infrastructure(format!(
            "Enrollment {} kept changing; gave up after {} conflicts",
            enrollment_id,
            self.max_conflict_retries + 1
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCourseCatalog, InMemoryEnrollmentRepository, InMemoryPaymentRecordRepository,
        RecordingNotificationSink,
    };
    use crate::domain::enrollment::CompletionStatus;
    use crate::domain::foundation::{Currency, IntentId, Money, PaymentId};
    use crate::domain::payment::{PaymentRecord, PaymentTransition};
    use std::time::Duration;

    struct Fixture {
        manager: EnrollmentManager,
        catalog: Arc<InMemoryCourseCatalog>,
        payments: Arc<InMemoryPaymentRecordRepository>,
        enrollments: Arc<InMemoryEnrollmentRepository>,
        sink: Arc<RecordingNotificationSink>,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(InMemoryCourseCatalog::new());
        let payments = Arc::new(InMemoryPaymentRecordRepository::new());
        let enrollments = Arc::new(InMemoryEnrollmentRepository::new());
        let sink = Arc::new(RecordingNotificationSink::new());
        let manager = EnrollmentManager::new(
            enrollments.clone(),
            payments.clone(),
            catalog.clone(),
            Notifier::new(sink.clone(), Duration::from_secs(1)),
            3,
        );
        Fixture {
            manager,
            catalog,
            payments,
            enrollments,
            sink,
        }
    }

    fn course(price: i64, published: bool, lessons: u32) -> CourseListing {
        CourseListing {
            id: CourseId::new(),
            title: "Async Rust".to_string(),
            price: Money::new(price, Currency::usd()).unwrap(),
            published,
            total_lessons: lessons,
        }
    }

    fn user() -> UserId {
        UserId::new("learner-1").unwrap()
    }

    async fn paid(f: &Fixture, user_id: &UserId, course: &CourseListing) {
        let mut record = PaymentRecord::new_pending(
            PaymentId::new(),
            IntentId::new(format!("pi_{}", course.id)).unwrap(),
            user_id.clone(),
            course.id,
            course.price.clone(),
        );
        record
            .apply(&PaymentTransition::Succeed { payment_method: None })
            .unwrap();
        f.payments.insert(&record).await.unwrap();
    }

    #[tokio::test]
    async fn free_course_enrolls_without_payment() {
        let f = fixture();
        let free = course(0, true, 4);
        f.catalog.upsert(free.clone()).await;

        let result = f
            .manager
            .enroll(EnrollCommand {
                user_id: user(),
                course_id: free.id,
            })
            .await
            .unwrap();

        assert!(result.created);
        assert_eq!(result.enrollment.status, CompletionStatus::Enrolled);
        assert_eq!(result.enrollment.progress, Percentage::ZERO);
        assert_eq!(f.sink.count(NotificationKind::Enrolled).await, 1);
    }

    #[tokio::test]
    async fn second_enroll_returns_existing_without_notifying() {
        let f = fixture();
        let free = course(0, true, 4);
        f.catalog.upsert(free.clone()).await;
        let cmd = EnrollCommand {
            user_id: user(),
            course_id: free.id,
        };

        let first = f.manager.enroll(cmd.clone()).await.unwrap();
        let second = f.manager.enroll(cmd).await.unwrap();

        assert!(!second.created);
        assert_eq!(first.enrollment.id, second.enrollment.id);
        assert_eq!(f.sink.count(NotificationKind::Enrolled).await, 1);
    }

    #[tokio::test]
    async fn paid_course_requires_succeeded_payment() {
        let f = fixture();
        let paid_course = course(2000, true, 4);
        f.catalog.upsert(paid_course.clone()).await;

        let err = f
            .manager
            .enroll(EnrollCommand {
                user_id: user(),
                course_id: paid_course.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::PaymentRequired { .. }));
    }

    #[tokio::test]
    async fn paid_course_enrolls_after_payment() {
        let f = fixture();
        let paid_course = course(2000, true, 4);
        f.catalog.upsert(paid_course.clone()).await;
        paid(&f, &user(), &paid_course).await;

        let result = f
            .manager
            .enroll(EnrollCommand {
                user_id: user(),
                course_id: paid_course.id,
            })
            .await
            .unwrap();

        assert!(result.created);
    }

    #[tokio::test]
    async fn unpublished_free_course_is_not_open() {
        let f = fixture();
        let draft = course(0, false, 4);
        f.catalog.upsert(draft.clone()).await;

        let err = f
            .manager
            .enroll(EnrollCommand {
                user_id: user(),
                course_id: draft.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::CourseNotOpen { .. }));
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let f = fixture();
        let err = f
            .manager
            .enroll(EnrollCommand {
                user_id: user(),
                course_id: CourseId::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::CourseNotFound(_)));
    }

    #[tokio::test]
    async fn zero_to_hundred_completes_and_notifies_once() {
        let f = fixture();
        let free = course(0, true, 4);
        f.catalog.upsert(free.clone()).await;
        let enrolled = f
            .manager
            .enroll(EnrollCommand {
                user_id: user(),
                course_id: free.id,
            })
            .await
            .unwrap()
            .enrollment;

        let done = f
            .manager
            .update_progress(UpdateProgressCommand {
                enrollment_id: enrolled.id,
                percentage: 100,
            })
            .await
            .unwrap();
        assert_eq!(done.status, CompletionStatus::Completed);
        assert!(done.completed_at.is_some());

        f.manager
            .update_progress(UpdateProgressCommand {
                enrollment_id: enrolled.id,
                percentage: 100,
            })
            .await
            .unwrap();

        assert_eq!(f.sink.count(NotificationKind::CourseCompleted).await, 1);
    }

    #[tokio::test]
    async fn out_of_range_percentage_is_rejected() {
        let f = fixture();
        let err = f
            .manager
            .update_progress(UpdateProgressCommand {
                enrollment_id: EnrollmentId::new(),
                percentage: 101,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn progress_moves_to_in_progress_and_persists_version() {
        let f = fixture();
        let free = course(0, true, 4);
        f.catalog.upsert(free.clone()).await;
        let enrolled = f
            .manager
            .enroll(EnrollCommand {
                user_id: user(),
                course_id: free.id,
            })
            .await
            .unwrap()
            .enrollment;

        let updated = f
            .manager
            .update_progress(UpdateProgressCommand {
                enrollment_id: enrolled.id,
                percentage: 30,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, CompletionStatus::InProgress);
        let stored = f.enrollments.find_by_id(&enrolled.id).await.unwrap().unwrap();
        assert_eq!(stored.version, updated.version);
        assert_eq!(stored.progress.value(), 30);
    }

    #[tokio::test]
    async fn lesson_progress_aggregates_and_completes() {
        let f = fixture();
        let free = course(0, true, 2);
        f.catalog.upsert(free.clone()).await;
        let enrolled = f
            .manager
            .enroll(EnrollCommand {
                user_id: user(),
                course_id: free.id,
            })
            .await
            .unwrap()
            .enrollment;

        let half = f
            .manager
            .record_lesson_progress(RecordLessonProgressCommand {
                enrollment_id: enrolled.id,
                lesson_id: LessonId::new(),
                watch_seconds: 600,
                completed: true,
            })
            .await
            .unwrap();
        assert_eq!(half.progress.value(), 50);
        assert_eq!(half.status, CompletionStatus::InProgress);

        let done = f
            .manager
            .record_lesson_progress(RecordLessonProgressCommand {
                enrollment_id: enrolled.id,
                lesson_id: LessonId::new(),
                watch_seconds: 300,
                completed: true,
            })
            .await
            .unwrap();
        assert!(done.is_completed());
        assert_eq!(f.sink.count(NotificationKind::CourseCompleted).await, 1);
    }

    #[tokio::test]
    async fn can_access_free_course_without_enrollment() {
        let f = fixture();
        let free = course(0, true, 1);
        let paid_course = course(1500, true, 1);
        f.catalog.upsert(free.clone()).await;
        f.catalog.upsert(paid_course.clone()).await;

        assert!(f.manager.can_access(&user(), &free.id).await.unwrap());
        assert!(!f.manager.can_access(&user(), &paid_course.id).await.unwrap());
    }
}
