use std::sync::Arc;

use async_trait::async_trait;

use stocklink_core::{ChannelName, WebhookLogId};

use super::types::{NewWebhookLog, WebhookLog, WebhookLogStatus, WebhookOutcome};

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Clone, thiserror::Error)]
pub enum WebhookLogStoreError {
    #[error("webhook log not found: {0}")]
    NotFound(WebhookLogId),
    #[error("webhook log {id} is already {status}")]
    AlreadyTerminal {
        id: WebhookLogId,
        status: WebhookLogStatus,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Inspection filter (newest rows first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookLogFilter {
    pub channel: Option<ChannelName>,
    pub status: Option<WebhookLogStatus>,
    pub limit: Option<usize>,
}

impl WebhookLogFilter {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }

    pub fn matches(&self, log: &WebhookLog) -> bool {
        self.channel.as_ref().is_none_or(|c| &log.channel == c)
            && self.status.is_none_or(|s| log.status == s)
    }
}

/// Audit-log persistence (insert-one / update-by-id).
///
/// Implementations must be safe for concurrent inserts and completions from
/// independent requests.
#[async_trait]
pub trait WebhookLogStore: Send + Sync {
    /// Insert a `pending` row and return its assigned id.
    async fn insert(&self, entry: NewWebhookLog) -> Result<WebhookLogId, WebhookLogStoreError>;

    /// Move a `pending` row to its terminal status.
    ///
    /// Fails with `AlreadyTerminal` if the row already left `pending`.
    async fn complete(
        &self,
        id: WebhookLogId,
        outcome: WebhookOutcome,
    ) -> Result<(), WebhookLogStoreError>;

    async fn get(&self, id: WebhookLogId) -> Result<Option<WebhookLog>, WebhookLogStoreError>;

    async fn list(&self, filter: &WebhookLogFilter) -> Result<Vec<WebhookLog>, WebhookLogStoreError>;

    async fn mark_processed(&self, id: WebhookLogId) -> Result<(), WebhookLogStoreError> {
        self.complete(id, WebhookOutcome::Processed).await
    }

    async fn mark_failed(
        &self,
        id: WebhookLogId,
        detail: String,
    ) -> Result<(), WebhookLogStoreError> {
        self.complete(id, WebhookOutcome::Failed(detail)).await
    }
}

#[async_trait]
impl<T> WebhookLogStore for Arc<T>
where
    T: WebhookLogStore + ?Sized,
{
    async fn insert(&self, entry: NewWebhookLog) -> Result<WebhookLogId, WebhookLogStoreError> {
        (**self).insert(entry).await
    }

    async fn complete(
        &self,
        id: WebhookLogId,
        outcome: WebhookOutcome,
    ) -> Result<(), WebhookLogStoreError> {
        (**self).complete(id, outcome).await
    }

    async fn get(&self, id: WebhookLogId) -> Result<Option<WebhookLog>, WebhookLogStoreError> {
        (**self).get(id).await
    }

    async fn list(&self, filter: &WebhookLogFilter) -> Result<Vec<WebhookLog>, WebhookLogStoreError> {
        (**self).list(filter).await
    }
}
