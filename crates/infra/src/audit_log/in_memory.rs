//! In-memory audit log for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use stocklink_core::WebhookLogId;

use super::store::{WebhookLogFilter, WebhookLogStore, WebhookLogStoreError};
use super::types::{NewWebhookLog, WebhookLog, WebhookOutcome};

#[derive(Debug, Default)]
pub struct InMemoryWebhookLogStore {
    logs: RwLock<HashMap<WebhookLogId, WebhookLog>>,
}

impl InMemoryWebhookLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, oldest first.
    pub fn all(&self) -> Vec<WebhookLog> {
        let mut rows: Vec<_> = self
            .logs
            .read()
            .map(|logs| logs.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by_key(|l| (l.created_at, l.id));
        rows
    }
}

fn poisoned() -> WebhookLogStoreError {
    WebhookLogStoreError::Storage("webhook log lock poisoned".into())
}

#[async_trait]
impl WebhookLogStore for InMemoryWebhookLogStore {
    async fn insert(&self, entry: NewWebhookLog) -> Result<WebhookLogId, WebhookLogStoreError> {
        let id = WebhookLogId::new();
        let row = WebhookLog::pending(id, entry, Utc::now());
        self.logs.write().map_err(|_| poisoned())?.insert(id, row);
        Ok(id)
    }

    async fn complete(
        &self,
        id: WebhookLogId,
        outcome: WebhookOutcome,
    ) -> Result<(), WebhookLogStoreError> {
        let mut logs = self.logs.write().map_err(|_| poisoned())?;
        let row = logs.get_mut(&id).ok_or(WebhookLogStoreError::NotFound(id))?;
        let status = row.status;
        row.complete(outcome, Utc::now())
            .map_err(|_| WebhookLogStoreError::AlreadyTerminal { id, status })
    }

    async fn get(&self, id: WebhookLogId) -> Result<Option<WebhookLog>, WebhookLogStoreError> {
        Ok(self.logs.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    async fn list(&self, filter: &WebhookLogFilter) -> Result<Vec<WebhookLog>, WebhookLogStoreError> {
        let logs = self.logs.read().map_err(|_| poisoned())?;
        let mut rows: Vec<_> = logs.values().filter(|l| filter.matches(l)).cloned().collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        rows.truncate(filter.effective_limit());
        Ok(rows)
    }
}
