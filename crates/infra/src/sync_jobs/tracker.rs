//! Executor-facing service over a [`SyncJobStore`].

use serde_json::{Map, Value as JsonValue};
use tracing::{info, warn};

use stocklink_core::{BatchId, SyncJobId};

use super::store::{SyncJobStore, SyncJobStoreError};
use super::types::{SyncJob, SyncJobStatus};

/// Drives sync jobs through their lifecycle.
///
/// Every operation loads the job, applies the transition in memory and writes
/// it back with the status it was loaded in as the expected status.
#[derive(Debug, Clone)]
pub struct SyncJobTracker<S> {
    store: S,
}

impl<S: SyncJobStore> SyncJobTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn enqueue(
        &self,
        job_type: &str,
        batch_id: Option<BatchId>,
        metadata: Map<String, JsonValue>,
    ) -> Result<SyncJob, SyncJobStoreError> {
        let job = SyncJob::new(job_type, batch_id, metadata)?;
        self.store.create(job.clone()).await?;
        info!(sync_job_id = %job.id, job_type, batch_id = ?batch_id, "sync job queued");
        Ok(job)
    }

    pub async fn start(&self, id: SyncJobId) -> Result<SyncJob, SyncJobStoreError> {
        let job = self.apply(id, |job| job.start().map_err(Into::into)).await?;
        info!(sync_job_id = %id, job_type = %job.job_type, "sync job started");
        Ok(job)
    }

    pub async fn complete(&self, id: SyncJobId) -> Result<SyncJob, SyncJobStoreError> {
        let job = self.apply(id, |job| job.complete().map_err(Into::into)).await?;
        info!(sync_job_id = %id, job_type = %job.job_type, "sync job completed");
        Ok(job)
    }

    pub async fn fail(
        &self,
        id: SyncJobId,
        reason: impl Into<String>,
    ) -> Result<SyncJob, SyncJobStoreError> {
        let reason = reason.into();
        let job = self
            .apply(id, |job| job.fail(reason.clone()).map_err(Into::into))
            .await?;
        warn!(sync_job_id = %id, job_type = %job.job_type, reason = %reason, "sync job failed");
        Ok(job)
    }

    /// Merge progress keys into a live job's metadata.
    pub async fn record_progress(
        &self,
        id: SyncJobId,
        progress: Map<String, JsonValue>,
    ) -> Result<SyncJob, SyncJobStoreError> {
        self.apply(id, |job| job.merge_metadata(progress.clone()).map_err(Into::into))
            .await
    }

    async fn apply<F>(&self, id: SyncJobId, mutate: F) -> Result<SyncJob, SyncJobStoreError>
    where
        F: FnOnce(&mut SyncJob) -> Result<(), SyncJobStoreError>,
    {
        let mut job = self
            .store
            .get(id)
            .await?
            .ok_or(SyncJobStoreError::NotFound(id))?;
        let expected: SyncJobStatus = job.status;
        mutate(&mut job)?;
        self.store.update(&job, expected).await?;
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::sync_jobs::store::InMemorySyncJobStore;
    use crate::sync_jobs::types::{ERROR_METADATA_KEY, job_types};

    fn tracker() -> SyncJobTracker<Arc<InMemorySyncJobStore>> {
        SyncJobTracker::new(InMemorySyncJobStore::arc())
    }

    fn progress(n: u64) -> Map<String, JsonValue> {
        json!({ "processed": n }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn runs_a_job_to_completion() {
        let t = tracker();
        let batch = BatchId::new();
        let job = t.enqueue(job_types::CATALOG, Some(batch), Map::new()).await.unwrap();

        t.start(job.id).await.unwrap();
        t.record_progress(job.id, progress(5)).await.unwrap();
        let done = t.complete(job.id).await.unwrap();

        assert_eq!(done.status, SyncJobStatus::Completed);
        assert_eq!(done.metadata["processed"], 5);
        let stored = t.store().get(job.id).await.unwrap().unwrap();
        assert_eq!(stored, done);
        stored.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn queued_jobs_cannot_be_failed() {
        let t = tracker();
        let job = t.enqueue(job_types::PRODUCT, None, Map::new()).await.unwrap();

        assert!(matches!(
            t.fail(job.id, "never ran").await,
            Err(SyncJobStoreError::Invalid(_))
        ));
        let stored = t.store().get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SyncJobStatus::Queued);
        assert!(stored.started_at.is_none());
    }

    #[tokio::test]
    async fn terminal_jobs_reject_further_transitions() {
        let t = tracker();
        let job = t.enqueue(job_types::BATCH, None, Map::new()).await.unwrap();
        t.start(job.id).await.unwrap();
        t.fail(job.id, "channel rate limited").await.unwrap();

        assert!(matches!(
            t.complete(job.id).await,
            Err(SyncJobStoreError::Invalid(_))
        ));
        assert!(t.start(job.id).await.is_err());
        assert!(t.fail(job.id, "again").await.is_err());
        assert!(t.record_progress(job.id, progress(1)).await.is_err());

        let stored = t.store().get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SyncJobStatus::Failed);
        assert_eq!(stored.metadata[ERROR_METADATA_KEY], "channel rate limited");
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let t = tracker();
        assert!(matches!(
            t.start(SyncJobId::new()).await,
            Err(SyncJobStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn blank_job_type_is_rejected() {
        let t = tracker();
        assert!(matches!(
            t.enqueue(" ", None, Map::new()).await,
            Err(SyncJobStoreError::Invalid(_))
        ));
    }
}
