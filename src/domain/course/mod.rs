//! Course read model.
//!
//! Courses are managed elsewhere; this core only reads the fields that
//! decide whether a course can be bought or joined for free.

use crate::domain::foundation::{CourseId, Money};
use serde::{Deserialize, Serialize};

/// Catalog view of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseListing {
    pub id: CourseId,
    pub title: String,
    pub price: Money,
    pub published: bool,

    /// Number of lessons, used to aggregate lesson progress.
    pub total_lessons: u32,
}

impl CourseListing {
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }

    /// Published and priced above zero.
    pub fn is_purchasable(&self) -> bool {
        self.published && !self.is_free()
    }

    /// Published and free.
    pub fn is_open_enrollment(&self) -> bool {
        self.published && self.is_free()
    }

    /// Why the course cannot be bought, `None` when it can.
    pub fn purchase_blocker(&self) -> Option<&'static str> {
        if !self.published {
            Some("course is not published")
        } else if self.is_free() {
            Some("course is free and does not require payment")
        } else {
            None
        }
    }
}
