//! Fire-and-forget wrapper over the notification sink.

use std::sync::Arc;
use std::time::Duration;

use crate::ports::{Notification, NotificationSink};

/// Sends notifications without ever failing the caller.
///
/// Errors and timeouts from the sink are logged and dropped. Payment and
/// enrollment state is already durable by the time this runs.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    pub async fn send(&self, notification: Notification) {
        let kind = notification.kind;
        let user_id = notification.user_id.clone();

        match tokio::time::timeout(self.timeout, self.sink.notify(notification)).await {
            Ok(Ok(())) => {
                tracing::debug!(user_id = %user_id, kind = kind.as_str(), "Notification sent");
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    user_id = %user_id,
                    kind = kind.as_str(),
                    error = %e,
                    "Notification failed, dropping"
                );
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user_id,
                    kind = kind.as_str(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Notification timed out, dropping"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainError, UserId};
    use crate::ports::NotificationKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingSink {
        calls: AtomicU32,
    }

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn notify(&self, _notification: Notification) -> Result<(), DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::database("smtp relay down"))
        }
    }

    struct SlowSink;

    #[async_trait]
    impl NotificationSink for SlowSink {
        async fn notify(&self, _notification: Notification) -> Result<(), DomainError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn notification() -> Notification {
        Notification::new(
            UserId::new("user-1").unwrap(),
            NotificationKind::Enrolled,
            serde_json::json!({}),
        )
    }

    #[tokio::test]
    async fn sink_errors_are_swallowed() {
        let sink = Arc::new(FailingSink {
            calls: AtomicU32::new(0),
        });
        let notifier = Notifier::new(sink.clone(), Duration::from_secs(1));

        notifier.send(notification()).await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_sink_is_cut_off() {
        let notifier = Notifier::new(Arc::new(SlowSink), Duration::from_millis(50));
        notifier.send(notification()).await;
    }
}
