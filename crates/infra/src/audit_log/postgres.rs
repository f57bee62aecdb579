//! Postgres-backed audit log.
//!
//! Terminality is enforced by the `UPDATE … WHERE status = 'pending'` guard,
//! so two racing completions cannot both win. When the guard matches nothing
//! the row is re-read to tell `NotFound` from `AlreadyTerminal`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stocklink_core::{ChannelName, WebhookLogId};

use super::store::{WebhookLogFilter, WebhookLogStore, WebhookLogStoreError};
use super::types::{NewWebhookLog, RawPayload, WebhookLog, WebhookOutcome};

#[derive(Debug, Clone)]
pub struct PostgresWebhookLogStore {
    pool: Arc<PgPool>,
}

impl PostgresWebhookLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> WebhookLogStoreError {
    WebhookLogStoreError::Storage(format!("{operation}: {err}"))
}

fn row_to_log(row: &PgRow) -> Result<WebhookLog, WebhookLogStoreError> {
    let decode = |e: sqlx::Error| WebhookLogStoreError::Storage(format!("decode webhook_logs row: {e}"));

    let channel: String = row.try_get("channel").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let headers: sqlx::types::Json<BTreeMap<String, String>> =
        row.try_get("headers").map_err(decode)?;

    Ok(WebhookLog {
        id: WebhookLogId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
        channel: ChannelName::parse(&channel)
            .map_err(|e| WebhookLogStoreError::Storage(format!("stored channel `{channel}`: {e}")))?,
        topic: row.try_get("topic").map_err(decode)?,
        payload: RawPayload::new(row.try_get::<Vec<u8>, _>("payload").map_err(decode)?),
        headers: headers.0,
        status: status
            .parse()
            .map_err(|e| WebhookLogStoreError::Storage(format!("stored status: {e}")))?,
        failure_detail: row.try_get("exception").map_err(decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(decode)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, channel, topic, payload, headers, status, exception, created_at, updated_at";

#[async_trait]
impl WebhookLogStore for PostgresWebhookLogStore {
    #[instrument(skip(self, entry), fields(channel = %entry.channel, topic = %entry.topic), err)]
    async fn insert(&self, entry: NewWebhookLog) -> Result<WebhookLogId, WebhookLogStoreError> {
        let id = WebhookLogId::new();
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO webhook_logs
                (id, channel, topic, payload, headers, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $6)
            RETURNING id
            "#,
        )
        .bind(id.as_uuid())
        .bind(entry.channel.as_str())
        .bind(&entry.topic)
        .bind(entry.payload.as_bytes())
        .bind(sqlx::types::Json(&entry.headers))
        .bind(now)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert webhook log", e))?;

        let assigned: Uuid = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("read assigned id", e))?;
        Ok(WebhookLogId::from_uuid(assigned))
    }

    #[instrument(skip(self, outcome), fields(audit_log_id = %id, status = %outcome.status()), err)]
    async fn complete(
        &self,
        id: WebhookLogId,
        outcome: WebhookOutcome,
    ) -> Result<(), WebhookLogStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_logs
            SET status = $2, exception = $3, updated_at = $4
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id.as_uuid())
        .bind(outcome.status().as_str())
        .bind(outcome.failure_detail())
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("complete webhook log", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.get(id).await? {
            Some(existing) => Err(WebhookLogStoreError::AlreadyTerminal {
                id,
                status: existing.status,
            }),
            None => Err(WebhookLogStoreError::NotFound(id)),
        }
    }

    async fn get(&self, id: WebhookLogId) -> Result<Option<WebhookLog>, WebhookLogStoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM webhook_logs WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get webhook log", e))?;

        row.as_ref().map(row_to_log).transpose()
    }

    async fn list(&self, filter: &WebhookLogFilter) -> Result<Vec<WebhookLog>, WebhookLogStoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM webhook_logs
            WHERE ($1::text IS NULL OR channel = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(filter.channel.as_ref().map(|c| c.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.effective_limit() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list webhook logs", e))?;

        rows.iter().map(row_to_log).collect()
    }
}
