//! PostgreSQL implementation of EnrollmentRepository.
//!
//! The `(user_id, course_id)` unique constraint makes concurrent enroll
//! calls converge on a single row; the loser reads the winner back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::enrollment::{CompletionStatus, Enrollment, LessonProgress};
use crate::domain::foundation::{
    CourseId, DomainError, EnrollmentId, ErrorCode, LessonId, Percentage, Timestamp, UserId,
};
use crate::ports::{EnrollmentRepository, InsertResult, UpdateResult};

const SELECT_ENROLLMENT: &str = r#"
    SELECT id, user_id, course_id, status, progress, enrolled_at, completed_at, updated_at, version
    FROM enrollments
"#;

pub struct PostgresEnrollmentRepository {
    pool: PgPool,
}

impl PostgresEnrollmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EnrollmentRow {
    id: Uuid,
    user_id: String,
    course_id: Uuid,
    status: String,
    progress: i16,
    enrolled_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = DomainError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<CompletionStatus>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid status: {}", e))
        })?;
        let progress = Percentage::try_new(i64::from(row.progress)).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid progress: {}", e))
        })?;
        let user_id = UserId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;

        Ok(Enrollment {
            id: EnrollmentId::from_uuid(row.id),
            user_id,
            course_id: CourseId::from_uuid(row.course_id),
            status,
            progress,
            enrolled_at: Timestamp::from_datetime(row.enrolled_at),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LessonProgressRow {
    enrollment_id: Uuid,
    lesson_id: Uuid,
    completed: bool,
    watch_seconds: i32,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<LessonProgressRow> for LessonProgress {
    fn from(row: LessonProgressRow) -> Self {
        LessonProgress {
            enrollment_id: EnrollmentId::from_uuid(row.enrollment_id),
            lesson_id: LessonId::from_uuid(row.lesson_id),
            completed: row.completed,
            watch_seconds: u32::try_from(row.watch_seconds).unwrap_or(0),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl EnrollmentRepository for PostgresEnrollmentRepository {
    async fn insert(&self, enrollment: &Enrollment) -> Result<InsertResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO enrollments (
                id, user_id, course_id, status, progress,
                enrolled_at, completed_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT ON CONSTRAINT enrollments_user_course_key DO NOTHING
            "#,
        )
        .bind(enrollment.id.as_uuid())
        .bind(enrollment.user_id.as_str())
        .bind(enrollment.course_id.as_uuid())
        .bind(enrollment.status.as_str())
        .bind(i16::from(enrollment.progress.value()))
        .bind(enrollment.enrolled_at.as_datetime())
        .bind(enrollment.completed_at.as_ref().map(|t| *t.as_datetime()))
        .bind(enrollment.updated_at.as_datetime())
        .bind(enrollment.version)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert enrollment", e))?;

        if result.rows_affected() == 1 {
            return Ok(InsertResult::Inserted);
        }

        let existing = self
            .find_by_pair(&enrollment.user_id, &enrollment.course_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!(
                        "Enrollment conflict for user {} course {} but no row found",
                        enrollment.user_id, enrollment.course_id
                    ),
                )
            })?;
        Ok(InsertResult::AlreadyExists(existing))
    }

    async fn update(&self, enrollment: &Enrollment) -> Result<UpdateResult, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE enrollments SET
                status = $3,
                progress = $4,
                completed_at = $5,
                updated_at = $6,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(enrollment.id.as_uuid())
        .bind(enrollment.version)
        .bind(enrollment.status.as_str())
        .bind(i16::from(enrollment.progress.value()))
        .bind(enrollment.completed_at.as_ref().map(|t| *t.as_datetime()))
        .bind(enrollment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update enrollment", e))?;

        if result.rows_affected() == 1 {
            return Ok(UpdateResult::Updated);
        }

        let exists: Option<(i64,)> = sqlx::query_as("SELECT version FROM enrollments WHERE id = $1")
            .bind(enrollment.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check enrollment", e))?;

        match exists {
            Some(_) => Ok(UpdateResult::VersionConflict),
            None => Err(DomainError::new(
                ErrorCode::EnrollmentNotFound,
                format!("Enrollment not found: {}", enrollment.id),
            )),
        }
    }

    async fn find_by_id(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, DomainError> {
        let row: Option<EnrollmentRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_ENROLLMENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find enrollment", e))?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn find_by_pair(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, DomainError> {
        let row: Option<EnrollmentRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 AND course_id = $2",
            SELECT_ENROLLMENT
        ))
        .bind(user_id.as_str())
        .bind(course_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find enrollment", e))?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, DomainError> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY enrolled_at DESC",
            SELECT_ENROLLMENT
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list enrollments", e))?;

        rows.into_iter().map(Enrollment::try_from).collect()
    }

    async fn save_lesson_progress(&self, progress: &LessonProgress) -> Result<(), DomainError> {
        let watch_seconds = i32::try_from(progress.watch_seconds).unwrap_or(i32::MAX);

        sqlx::query(
            r#"
            INSERT INTO lesson_progress (
                enrollment_id, lesson_id, completed, watch_seconds, completed_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (enrollment_id, lesson_id) DO UPDATE SET
                completed = EXCLUDED.completed,
                watch_seconds = EXCLUDED.watch_seconds,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(progress.enrollment_id.as_uuid())
        .bind(progress.lesson_id.as_uuid())
        .bind(progress.completed)
        .bind(watch_seconds)
        .bind(progress.completed_at.as_ref().map(|t| *t.as_datetime()))
        .bind(progress.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save lesson progress", e))?;

        Ok(())
    }

    async fn find_lesson_progress(
        &self,
        enrollment_id: &EnrollmentId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, DomainError> {
        let row: Option<LessonProgressRow> = sqlx::query_as(
            r#"
            SELECT enrollment_id, lesson_id, completed, watch_seconds, completed_at, updated_at
            FROM lesson_progress
            WHERE enrollment_id = $1 AND lesson_id = $2
            "#,
        )
        .bind(enrollment_id.as_uuid())
        .bind(lesson_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find lesson progress", e))?;

        Ok(row.map(LessonProgress::from))
    }

    async fn list_lesson_progress(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Vec<LessonProgress>, DomainError> {
        let rows: Vec<LessonProgressRow> = sqlx::query_as(
            r#"
            SELECT enrollment_id, lesson_id, completed, watch_seconds, completed_at, updated_at
            FROM lesson_progress
            WHERE enrollment_id = $1
            "#,
        )
        .bind(enrollment_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list lesson progress", e))?;

        Ok(rows.into_iter().map(LessonProgress::from).collect())
    }
}
