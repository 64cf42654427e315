//! Enrollment domain - course access and learning progress.

mod aggregate;
mod errors;
mod progress;
mod status;

pub use aggregate::{Enrollment, ProgressChange};
pub use errors::EnrollmentError;
pub use progress::{aggregate_progress, LessonProgress};
pub use status::CompletionStatus;
