//! Enrollment aggregate.
//!
//! Links a user to a course they may access. Linked to payments only by
//! the (user, course) pair, never by a payment id, so either side can
//! change without the other.

use crate::domain::foundation::{
    CourseId, EnrollmentId, Percentage, StateMachine, Timestamp, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};

use super::CompletionStatus;

/// Effect of a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressChange {
    /// Nothing changed (same value, or the enrollment was already completed).
    Unchanged,

    /// Percentage and possibly status changed, not completed.
    Updated { from: CompletionStatus },

    /// This update completed the course. Happens at most once per enrollment.
    Completed { from: CompletionStatus },
}

impl ProgressChange {
    pub fn is_change(&self) -> bool {
        !matches!(self, ProgressChange::Unchanged)
    }
}

/// Enrollment aggregate.
///
/// # Invariants
///
/// - (`user_id`, `course_id`) is unique across all enrollments
/// - `completed_at` is set iff `status == Completed`
/// - `status == Completed` implies `progress == 100`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub status: CompletionStatus,
    pub progress: Percentage,
    pub enrolled_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,

    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: i64,
}

impl Enrollment {
    /// Creates a fresh enrollment with no progress.
    pub fn new(id: EnrollmentId, user_id: UserId, course_id: CourseId) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id,
            course_id,
            status: CompletionStatus::Enrolled,
            progress: Percentage::ZERO,
            enrolled_at: now,
            completed_at: None,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == CompletionStatus::Completed
    }

    /// Records a new overall percentage.
    ///
    /// Any value above zero moves ENROLLED to IN_PROGRESS; 100 completes the
    /// course. A completed enrollment ignores further updates.
    pub fn record_progress(&mut self, percentage: Percentage) -> Result<ProgressChange, ValidationError> {
        let from = self.status;
        if from == CompletionStatus::Completed {
            return Ok(ProgressChange::Unchanged);
        }

        if percentage.is_complete() {
            self.status = from.transition_to(CompletionStatus::Completed)?;
            let now = Timestamp::now();
            self.progress = Percentage::HUNDRED;
            self.completed_at = Some(now);
            self.updated_at = now;
            return Ok(ProgressChange::Completed { from });
        }

        let mut changed = false;
        if percentage.value() > 0 && from == CompletionStatus::Enrolled {
            self.status = from.transition_to(CompletionStatus::InProgress)?;
            changed = true;
        }
        if self.progress != percentage {
            self.progress = percentage;
            changed = true;
        }

        if changed {
            self.updated_at = Timestamp::now();
            Ok(ProgressChange::Updated { from })
        } else {
            Ok(ProgressChange::Unchanged)
        }
    }
}
