//! Enrollment handlers.

mod manager;

pub use manager::{
    EnrollCommand, EnrollResult, EnrollmentManager, RecordLessonProgressCommand,
    UpdateProgressCommand,
};
