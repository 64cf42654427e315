//! Notification sink adapters.
//!
//! Delivery transport is external; the bundled sink writes notifications to
//! the structured log so a log shipper can forward them.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{Notification, NotificationSink};

/// Emits each notification as a `tracing` event on the `notifications` target.
#[derive(Debug, Default, Clone)]
pub struct TracingNotificationSink;

impl TracingNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<(), DomainError> {
        tracing::info!(
            target: "notifications",
            user_id = %notification.user_id,
            kind = notification.kind.as_str(),
            payload = %notification.payload,
            "Notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::ports::NotificationKind;

    #[tokio::test]
    async fn tracing_sink_never_fails() {
        let sink = TracingNotificationSink::new();
        let result = sink
            .notify(Notification::new(
                UserId::new("u1").unwrap(),
                NotificationKind::CourseCompleted,
                serde_json::json!({ "course_id": "c1" }),
            ))
            .await;
        assert!(result.is_ok());
    }
}
