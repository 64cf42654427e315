//! Enrollment completion state machine.
//!
//! ```text
//! ENROLLED ──► IN_PROGRESS ──► COMPLETED
//!    └────────────────────────────▲
//! ```

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far a learner has come through a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Enrolled, no progress yet.
    Enrolled,

    /// Some progress recorded.
    InProgress,

    /// Reached 100%. Terminal.
    Completed,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Enrolled => "enrolled",
            CompletionStatus::InProgress => "in_progress",
            CompletionStatus::Completed => "completed",
        }
    }
}

impl StateMachine for CompletionStatus {
    fn successors(&self) -> &'static [Self] {
        use CompletionStatus::*;
        match self {
            Enrolled => &[InProgress, Completed],
            InProgress => &[Completed],
            Completed => &[],
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrolled" => Ok(CompletionStatus::Enrolled),
            "in_progress" => Ok(CompletionStatus::InProgress),
            "completed" => Ok(CompletionStatus::Completed),
            other => Err(format!("unknown completion status '{}'", other)),
        }
    }
}
