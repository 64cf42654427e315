//! Course progress as a whole percent.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Whole percent in `0..=100`. Only exactly 100 counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Percentage(u8);

impl Percentage {
    pub const ZERO: Self = Self(0);
    pub const HUNDRED: Self = Self(100);

    /// Saturates at 100.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// Checked constructor for client input.
    pub fn try_new(value: i64) -> Result<Self, ValidationError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or_else(|| ValidationError::out_of_range("percentage", 0, 100, value))
    }

    /// Completed share of a course, rounded to the nearest percent.
    ///
    /// Rounding never reaches 100 while `part < whole`, so completion
    /// requires every lesson. A course with no lessons reports zero.
    pub fn of(part: u32, whole: u32) -> Self {
        if whole == 0 {
            return Self::ZERO;
        }
        if part >= whole {
            return Self::HUNDRED;
        }
        let (part, whole) = (u64::from(part), u64::from(whole));
        let rounded = (part * 100 + whole / 2) / whole;
        Self(rounded.min(99) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        *self == Self::HUNDRED
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<i64> for Percentage {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Percentage> for u8 {
    fn from(p: Percentage) -> Self {
        p.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(Percentage::try_new(0).unwrap(), Percentage::ZERO);
        assert_eq!(Percentage::try_new(100).unwrap(), Percentage::HUNDRED);
    }

    #[test]
    fn out_of_range_input_reports_the_value() {
        assert_eq!(
            Percentage::try_new(101).unwrap_err(),
            ValidationError::out_of_range("percentage", 0, 100, 101)
        );
        assert!(Percentage::try_new(-1).is_err());
        assert!(Percentage::try_new(i64::MAX).is_err());
    }

    #[test]
    fn lesson_share_rounds_to_nearest() {
        assert_eq!(Percentage::of(1, 3).value(), 33);
        assert_eq!(Percentage::of(2, 3).value(), 67);
        assert_eq!(Percentage::of(1, 4).value(), 25);
        assert_eq!(Percentage::of(0, 0), Percentage::ZERO);
    }

    #[test]
    fn missing_lesson_never_rounds_to_complete() {
        let almost = Percentage::of(199, 200);
        assert_eq!(almost.value(), 99);
        assert!(!almost.is_complete());
        assert!(Percentage::of(200, 200).is_complete());
        assert!(Percentage::of(5, 3).is_complete());
    }

    #[test]
    fn deserializing_checks_the_range() {
        assert_eq!(serde_json::from_str::<Percentage>("42").unwrap().value(), 42);
        assert!(serde_json::from_str::<Percentage>("120").is_err());
        assert_eq!(serde_json::to_string(&Percentage::new(7)).unwrap(), "7");
    }
}
