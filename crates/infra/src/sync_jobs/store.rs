//! Sync-job storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use stocklink_core::{BatchId, DomainError, SyncJobId};

use super::types::{SyncJob, SyncJobStatus};

/// Sync-job store abstraction.
///
/// `update` is a compare-and-set on status: it only applies when the stored
/// job is still in `expected`. That is enough to keep the state machine
/// monotonic even if two executors race on the same id.
#[async_trait]
pub trait SyncJobStore: Send + Sync {
    async fn create(&self, job: SyncJob) -> Result<SyncJobId, SyncJobStoreError>;

    async fn get(&self, id: SyncJobId) -> Result<Option<SyncJob>, SyncJobStoreError>;

    /// Persist `job` if the stored status is still `expected`.
    async fn update(
        &self,
        job: &SyncJob,
        expected: SyncJobStatus,
    ) -> Result<(), SyncJobStoreError>;

    /// Jobs of a batch, oldest first.
    async fn list_by_batch(&self, batch_id: BatchId) -> Result<Vec<SyncJob>, SyncJobStoreError>;

    /// Jobs (optionally of one status), oldest first.
    async fn list_by_status(
        &self,
        status: Option<SyncJobStatus>,
        limit: usize,
    ) -> Result<Vec<SyncJob>, SyncJobStoreError>;

    async fn stats(&self) -> Result<SyncJobStats, SyncJobStoreError>;
}

#[async_trait]
impl<T> SyncJobStore for Arc<T>
where
    T: SyncJobStore + ?Sized,
{
    async fn create(&self, job: SyncJob) -> Result<SyncJobId, SyncJobStoreError> {
        (**self).create(job).await
    }

    async fn get(&self, id: SyncJobId) -> Result<Option<SyncJob>, SyncJobStoreError> {
        (**self).get(id).await
    }

    async fn update(
        &self,
        job: &SyncJob,
        expected: SyncJobStatus,
    ) -> Result<(), SyncJobStoreError> {
        (**self).update(job, expected).await
    }

    async fn list_by_batch(&self, batch_id: BatchId) -> Result<Vec<SyncJob>, SyncJobStoreError> {
        (**self).list_by_batch(batch_id).await
    }

    async fn list_by_status(
        &self,
        status: Option<SyncJobStatus>,
        limit: usize,
    ) -> Result<Vec<SyncJob>, SyncJobStoreError> {
        (**self).list_by_status(status, limit).await
    }

    async fn stats(&self) -> Result<SyncJobStats, SyncJobStoreError> {
        (**self).stats().await
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncJobStoreError {
    #[error("sync job not found: {0}")]
    NotFound(SyncJobId),
    #[error("sync job already exists: {0}")]
    AlreadyExists(SyncJobId),
    #[error("sync job {id} was {actual}, expected {expected}")]
    Conflict {
        id: SyncJobId,
        expected: SyncJobStatus,
        actual: SyncJobStatus,
    },
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncJobStats {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl SyncJobStats {
    pub fn record(&mut self, status: SyncJobStatus, count: usize) {
        match status {
            SyncJobStatus::Queued => self.queued += count,
            SyncJobStatus::Running => self.running += count,
            SyncJobStatus::Completed => self.completed += count,
            SyncJobStatus::Failed => self.failed += count,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.running + self.completed + self.failed
    }
}

/// Shape checks every store applies before writing.
///
/// The new state must be a legal move from `expected` (or `expected` itself,
/// for metadata-only updates on a live job) and satisfy the timestamp rules.
pub(crate) fn validate_update(job: &SyncJob, expected: SyncJobStatus) -> Result<(), SyncJobStoreError> {
    let same_live_status = job.status == expected && !expected.is_terminal();
    if !same_live_status && !expected.can_transition_to(job.status) {
        return Err(DomainError::illegal_transition("sync job", expected, job.status).into());
    }
    job.check_invariants()?;
    Ok(())
}

/// In-memory sync-job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySyncJobStore {
    jobs: RwLock<HashMap<SyncJobId, SyncJob>>,
}

impl InMemorySyncJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

fn poisoned() -> SyncJobStoreError {
    SyncJobStoreError::Storage("sync job lock poisoned".into())
}

#[async_trait]
impl SyncJobStore for InMemorySyncJobStore {
    async fn create(&self, job: SyncJob) -> Result<SyncJobId, SyncJobStoreError> {
        job.check_invariants()?;
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        if jobs.contains_key(&job.id) {
            return Err(SyncJobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    async fn get(&self, id: SyncJobId) -> Result<Option<SyncJob>, SyncJobStoreError> {
        Ok(self.jobs.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    async fn update(
        &self,
        job: &SyncJob,
        expected: SyncJobStatus,
    ) -> Result<(), SyncJobStoreError> {
        validate_update(job, expected)?;
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        let stored = jobs
            .get_mut(&job.id)
            .ok_or(SyncJobStoreError::NotFound(job.id))?;
        if stored.status != expected {
            return Err(SyncJobStoreError::Conflict {
                id: job.id,
                expected,
                actual: stored.status,
            });
        }
        *stored = job.clone();
        Ok(())
    }

    async fn list_by_batch(&self, batch_id: BatchId) -> Result<Vec<SyncJob>, SyncJobStoreError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| j.batch_id == Some(batch_id))
            .cloned()
            .collect();
        result.sort_by_key(|j| (j.created_at, j.id));
        Ok(result)
    }

    async fn list_by_status(
        &self,
        status: Option<SyncJobStatus>,
        limit: usize,
    ) -> Result<Vec<SyncJob>, SyncJobStoreError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        result.sort_by_key(|j| (j.created_at, j.id));
        result.truncate(limit);
        Ok(result)
    }

    async fn stats(&self) -> Result<SyncJobStats, SyncJobStoreError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        let mut stats = SyncJobStats::default();
        for job in jobs.values() {
            stats.record(job.status, 1);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::sync_jobs::types::job_types;

    fn job(batch: Option<BatchId>) -> SyncJob {
        SyncJob::new(job_types::PRODUCT, batch, Map::new()).unwrap()
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = InMemorySyncJobStore::new();
        let j = job(None);
        let id = store.create(j.clone()).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), Some(j.clone()));
        assert!(matches!(
            store.create(j).await,
            Err(SyncJobStoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn update_is_compare_and_set_on_status() {
        let store = InMemorySyncJobStore::new();
        let mut j = job(None);
        store.create(j.clone()).await.unwrap();

        j.start().unwrap();
        store.update(&j, SyncJobStatus::Queued).await.unwrap();

        // A second executor still believing the job is queued loses.
        let mut stale = j.clone();
        stale.status = SyncJobStatus::Queued;
        stale.started_at = None;
        stale.start().unwrap();
        let err = store.update(&stale, SyncJobStatus::Queued).await.unwrap_err();
        assert!(matches!(
            err,
            SyncJobStoreError::Conflict {
                expected: SyncJobStatus::Queued,
                actual: SyncJobStatus::Running,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn terminal_jobs_reject_writes() {
        let store = InMemorySyncJobStore::new();
        let mut j = job(None);
        store.create(j.clone()).await.unwrap();
        j.start().unwrap();
        store.update(&j, SyncJobStatus::Queued).await.unwrap();
        j.complete().unwrap();
        store.update(&j, SyncJobStatus::Running).await.unwrap();

        let mut reopened = j.clone();
        reopened.status = SyncJobStatus::Running;
        reopened.finished_at = None;
        let err = store
            .update(&reopened, SyncJobStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncJobStoreError::Invalid(_)));
        assert_eq!(
            store.get(j.id).await.unwrap().unwrap().status,
            SyncJobStatus::Completed
        );
    }

    #[tokio::test]
    async fn unknown_job_update_is_not_found() {
        let store = InMemorySyncJobStore::new();
        let mut j = job(None);
        j.start().unwrap();
        assert!(matches!(
            store.update(&j, SyncJobStatus::Queued).await,
            Err(SyncJobStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn batch_listing_and_stats() {
        let store = InMemorySyncJobStore::new();
        let batch = BatchId::new();
        let a = job(Some(batch));
        let b = job(Some(batch));
        let other = job(None);
        for j in [a.clone(), b.clone(), other] {
            store.create(j).await.unwrap();
        }
        let mut running = a.clone();
        running.start().unwrap();
        store.update(&running, SyncJobStatus::Queued).await.unwrap();

        let in_batch = store.list_by_batch(batch).await.unwrap();
        assert_eq!(in_batch.len(), 2);
        assert!(in_batch.iter().all(|j| j.batch_id == Some(batch)));

        let queued = store
            .list_by_status(Some(SyncJobStatus::Queued), 10)
            .await
            .unwrap();
        assert_eq!(queued.len(), 2);
        assert_eq!(store.list_by_status(None, 1).await.unwrap().len(), 1);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.total(), 3);
    }
}
