//! In-memory WebhookEventLog.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::ports::{WebhookEventEntry, WebhookEventLog, WebhookOutcome};

#[derive(Default)]
pub struct InMemoryWebhookEventLog {
    entries: RwLock<HashMap<String, WebhookEventEntry>>,
}

impl InMemoryWebhookEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookEventLog for InMemoryWebhookEventLog {
    async fn record(&self, entry: WebhookEventEntry) -> Result<(), DomainError> {
        self.entries
            .write()
            .await
            .insert(entry.event_id.clone(), entry);
        Ok(())
    }

    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEventEntry>, DomainError> {
        Ok(self.entries.read().await.get(event_id).cloned())
    }

    async fn list_dead_letters(&self, limit: u32) -> Result<Vec<WebhookEventEntry>, DomainError> {
        let mut dead: Vec<WebhookEventEntry> = self
            .entries
            .read()
            .await
            .values()
            .filter(|e| e.outcome == WebhookOutcome::DeadLettered)
            .cloned()
            .collect();
        dead.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        dead.truncate(limit as usize);
        Ok(dead)
    }
}
