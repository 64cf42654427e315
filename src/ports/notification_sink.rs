//! Notification sink port.
//!
//! Delivery transport (email, push, in-app) lives behind this trait.
//! Callers never let a notification failure affect payment or enrollment
//! state; see `application::Notifier`.

use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kinds of user-facing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Enrolled,
    CourseCompleted,
    PaymentSucceeded,
    PaymentRefunded,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Enrolled => "enrolled",
            NotificationKind::CourseCompleted => "course_completed",
            NotificationKind::PaymentSucceeded => "payment_succeeded",
            NotificationKind::PaymentRefunded => "payment_refunded",
        }
    }
}

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(user_id: UserId, kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self {
            user_id,
            kind,
            payload,
        }
    }
}

/// Port for sending notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), DomainError>;
}
