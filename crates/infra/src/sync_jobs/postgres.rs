//! Postgres-backed sync-job store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stocklink_core::{BatchId, SyncJobId};

use super::store::{SyncJobStats, SyncJobStore, SyncJobStoreError, validate_update};
use super::types::{SyncJob, SyncJobStatus};

const SELECT_COLUMNS: &str =
    "id, job_type, batch_id, status, metadata, started_at, finished_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresSyncJobStore {
    pool: Arc<PgPool>,
}

impl PostgresSyncJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn storage(operation: &str, err: sqlx::Error) -> SyncJobStoreError {
    SyncJobStoreError::Storage(format!("{operation}: {err}"))
}

fn row_to_job(row: &PgRow) -> Result<SyncJob, SyncJobStoreError> {
    let decode = |e: sqlx::Error| storage("decode sync_jobs row", e);

    let status: String = row.try_get("status").map_err(decode)?;
    let metadata: sqlx::types::Json<Map<String, JsonValue>> =
        row.try_get("metadata").map_err(decode)?;
    let batch_id: Option<Uuid> = row.try_get("batch_id").map_err(decode)?;

    Ok(SyncJob {
        id: SyncJobId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode)?),
        job_type: row.try_get("job_type").map_err(decode)?,
        batch_id: batch_id.map(BatchId::from_uuid),
        status: status.parse()?,
        metadata: metadata.0,
        started_at: row.try_get::<Option<DateTime<Utc>>, _>("started_at").map_err(decode)?,
        finished_at: row.try_get::<Option<DateTime<Utc>>, _>("finished_at").map_err(decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(decode)?,
    })
}

#[async_trait]
impl SyncJobStore for PostgresSyncJobStore {
    #[instrument(skip(self, job), fields(sync_job_id = %job.id, job_type = %job.job_type), err)]
    async fn create(&self, job: SyncJob) -> Result<SyncJobId, SyncJobStoreError> {
        job.check_invariants()?;

        let result = sqlx::query(
            r#"
            INSERT INTO sync_jobs
                (id, job_type, batch_id, status, metadata, started_at, finished_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(&job.job_type)
        .bind(job.batch_id.map(|b| *b.as_uuid()))
        .bind(job.status.as_str())
        .bind(sqlx::types::Json(&job.metadata))
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| storage("insert sync job", e))?;

        if result.rows_affected() == 0 {
            return Err(SyncJobStoreError::AlreadyExists(job.id));
        }
        Ok(job.id)
    }

    async fn get(&self, id: SyncJobId) -> Result<Option<SyncJob>, SyncJobStoreError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM sync_jobs WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| storage("get sync job", e))?;

        row.as_ref().map(row_to_job).transpose()
    }

    #[instrument(skip(self, job), fields(sync_job_id = %job.id, status = %job.status), err)]
    async fn update(
        &self,
        job: &SyncJob,
        expected: SyncJobStatus,
    ) -> Result<(), SyncJobStoreError> {
        validate_update(job, expected)?;

        let result = sqlx::query(
            r#"
            UPDATE sync_jobs
            SET status = $3, metadata = $4, started_at = $5, finished_at = $6, updated_at = $7
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(expected.as_str())
        .bind(job.status.as_str())
        .bind(sqlx::types::Json(&job.metadata))
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| storage("update sync job", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.get(job.id).await? {
            Some(stored) => Err(SyncJobStoreError::Conflict {
                id: job.id,
                expected,
                actual: stored.status,
            }),
            None => Err(SyncJobStoreError::NotFound(job.id)),
        }
    }

    async fn list_by_batch(&self, batch_id: BatchId) -> Result<Vec<SyncJob>, SyncJobStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sync_jobs WHERE batch_id = $1 ORDER BY created_at, id"
        ))
        .bind(batch_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| storage("list sync jobs by batch", e))?;

        rows.iter().map(row_to_job).collect()
    }

    async fn list_by_status(
        &self,
        status: Option<SyncJobStatus>,
        limit: usize,
    ) -> Result<Vec<SyncJob>, SyncJobStoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM sync_jobs
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at, id
            LIMIT $2
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| storage("list sync jobs by status", e))?;

        rows.iter().map(row_to_job).collect()
    }

    async fn stats(&self) -> Result<SyncJobStats, SyncJobStoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM sync_jobs GROUP BY status")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| storage("sync job stats", e))?;

        let mut stats = SyncJobStats::default();
        for row in rows {
            let status: String = row.try_get("status").map_err(|e| storage("decode stats", e))?;
            let n: i64 = row.try_get("n").map_err(|e| storage("decode stats", e))?;
            stats.record(status.parse()?, usize::try_from(n).unwrap_or(0));
        }
        Ok(stats)
    }
}
