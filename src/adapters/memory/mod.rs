//! In-process adapters.
//!
//! Used by the test suites and by `main` when no database is configured.
//! They hold the same uniqueness and compare-and-set rules as the
//! postgres adapters.

mod catalog;
mod enrollments;
mod notifications;
mod payment_records;
mod webhook_log;

pub use catalog::InMemoryCourseCatalog;
pub use enrollments::InMemoryEnrollmentRepository;
pub use notifications::RecordingNotificationSink;
pub use payment_records::InMemoryPaymentRecordRepository;
pub use webhook_log::InMemoryWebhookEventLog;
