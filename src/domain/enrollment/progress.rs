//! Per-lesson progress within an enrollment.

use crate::domain::foundation::{EnrollmentId, LessonId, Percentage, Timestamp};
use serde::{Deserialize, Serialize};

/// Progress of one lesson for one enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub enrollment_id: EnrollmentId,
    pub lesson_id: LessonId,
    pub completed: bool,
    pub watch_seconds: u32,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl LessonProgress {
    pub fn new(enrollment_id: EnrollmentId, lesson_id: LessonId) -> Self {
        Self {
            enrollment_id,
            lesson_id,
            completed: false,
            watch_seconds: 0,
            completed_at: None,
            updated_at: Timestamp::now(),
        }
    }

    /// Merges a progress report.
    ///
    /// Watch time keeps the highest value seen and completion is sticky, so
    /// out-of-order reports from several devices never lose progress.
    pub fn record(&mut self, watch_seconds: u32, completed: bool) {
        let now = Timestamp::now();
        self.watch_seconds = self.watch_seconds.max(watch_seconds);
        if completed && !self.completed {
            self.completed = true;
            self.completed_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// Overall course percentage from lesson progress.
pub fn aggregate_progress(lessons: &[LessonProgress], total_lessons: u32) -> Percentage {
    let completed = lessons.iter().filter(|l| l.completed).count() as u32;
    Percentage::of(completed, total_lessons)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(completed: bool) -> LessonProgress {
        let mut p = LessonProgress::new(EnrollmentId::new(), LessonId::new());
        p.record(30, completed);
        p
    }

    #[test]
    fn completion_is_sticky() {
        let mut p = lesson(true);
        let first = p.completed_at;
        p.record(10, false);
        assert!(p.completed);
        assert_eq!(p.completed_at, first);
        assert_eq!(p.watch_seconds, 30);
    }

    #[test]
    fn aggregate_counts_completed_lessons() {
        let lessons = vec![lesson(true), lesson(false), lesson(true), lesson(false)];
        assert_eq!(aggregate_progress(&lessons, 4).value(), 50);
    }

    #[test]
    fn aggregate_of_empty_course_is_zero() {
        assert_eq!(aggregate_progress(&[], 0), Percentage::ZERO);
    }

    #[test]
    fn aggregate_all_completed_is_hundred() {
        let lessons = vec![lesson(true), lesson(true), lesson(true)];
        assert!(aggregate_progress(&lessons, 3).is_complete());
    }
}
