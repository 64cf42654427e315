//! NotificationSink that keeps everything it receives. Test helper.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{Notification, NotificationKind, NotificationSink};

#[derive(Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn count(&self, kind: NotificationKind) -> usize {
        self.sent.lock().await.iter().filter(|n| n.kind == kind).count()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<(), DomainError> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}
