//! Lifecycle status enums.
//!
//! Payment and enrollment statuses declare their one-step successors; the
//! rest (validated moves, terminal checks) follows from that table.

use std::fmt;

use super::ValidationError;

/// A status enum with a fixed successor table.
///
/// ```ignore
/// let next = PaymentStatus::Pending.transition_to(PaymentStatus::Succeeded)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + fmt::Display + 'static {
    /// Statuses reachable from `self` in one step.
    fn successors(&self) -> &'static [Self];

    fn can_transition_to(&self, target: &Self) -> bool {
        self.successors().contains(target)
    }

    /// Moves to `target` or explains why the lifecycle forbids it.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            return Ok(target);
        }
        Err(ValidationError::invalid_format(
            "status",
            format!("cannot move from {} to {}", self, target),
        ))
    }

    /// No successors; the lifecycle has ended.
    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}
