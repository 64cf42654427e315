//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentRecordRepository` - payment records with CAS updates
//! - `PostgresEnrollmentRepository` - enrollments and per-lesson progress
//! - `PostgresCourseCatalog` - read-only course listings
//! - `PostgresWebhookEventLog` - webhook outcomes and dead letters

mod course_catalog;
mod enrollment_repository;
mod payment_record_repository;
mod webhook_event_log;

pub use course_catalog::PostgresCourseCatalog;
pub use enrollment_repository::PostgresEnrollmentRepository;
pub use payment_record_repository::PostgresPaymentRecordRepository;
pub use webhook_event_log::PostgresWebhookEventLog;
