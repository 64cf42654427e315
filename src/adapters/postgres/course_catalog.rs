//! PostgreSQL read model for the course catalog.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::course::CourseListing;
use crate::domain::foundation::{CourseId, Currency, DomainError, ErrorCode, Money};
use crate::ports::CourseCatalog;

pub struct PostgresCourseCatalog {
    pool: PgPool,
}

impl PostgresCourseCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    price_minor: i64,
    currency: String,
    published: bool,
    total_lessons: i32,
}

impl TryFrom<CourseRow> for CourseListing {
    type Error = DomainError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        let currency = Currency::new(row.currency.trim()).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid currency: {}", e))
        })?;
        let price = Money::new(row.price_minor, currency).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid price: {}", e))
        })?;

        Ok(CourseListing {
            id: CourseId::from_uuid(row.id),
            title: row.title,
            price,
            published: row.published,
            total_lessons: u32::try_from(row.total_lessons).unwrap_or(0),
        })
    }
}

#[async_trait]
impl CourseCatalog for PostgresCourseCatalog {
    async fn find_course(&self, course_id: &CourseId) -> Result<Option<CourseListing>, DomainError> {
        let row: Option<CourseRow> = sqlx::query_as(
            r#"
            SELECT id, title, price_minor, currency, published, total_lessons
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Failed to find course: {}", e)))?;

        row.map(CourseListing::try_from).transpose()
    }
}
