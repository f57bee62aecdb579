//! Sync-job record and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use stocklink_core::{BatchId, DomainError, DomainResult, SyncJobId};

/// Well-known job type tags. The field itself is free-form.
pub mod job_types {
    pub const CATALOG: &str = "catalog";
    pub const PRODUCT: &str = "product";
    pub const BATCH: &str = "batch";
}

/// Metadata key `fail` records the reason under.
pub const ERROR_METADATA_KEY: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncJobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl SyncJobStatus {
    pub const ALL: [SyncJobStatus; 4] = [
        SyncJobStatus::Queued,
        SyncJobStatus::Running,
        SyncJobStatus::Completed,
        SyncJobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncJobStatus::Queued => "queued",
            SyncJobStatus::Running => "running",
            SyncJobStatus::Completed => "completed",
            SyncJobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncJobStatus::Completed | SyncJobStatus::Failed)
    }

    /// Legal moves of the state machine. Staying put is not a transition.
    pub fn can_transition_to(&self, next: SyncJobStatus) -> bool {
        use SyncJobStatus::*;
        matches!(
            (self, next),
            (Queued, Running) | (Running, Completed) | (Running, Failed)
        )
    }
}

impl core::fmt::Display for SyncJobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for SyncJobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncJobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown sync job status `{s}`")))
    }
}

/// A tracked unit of bulk synchronization work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    pub job_type: String,
    pub batch_id: Option<BatchId>,
    pub status: SyncJobStatus,
    pub metadata: Map<String, JsonValue>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncJob {
    pub fn new(
        job_type: impl Into<String>,
        batch_id: Option<BatchId>,
        metadata: Map<String, JsonValue>,
    ) -> DomainResult<Self> {
        let job_type = job_type.into();
        if job_type.trim().is_empty() {
            return Err(DomainError::validation("sync job type cannot be empty"));
        }
        let now = Utc::now();
        Ok(Self {
            id: SyncJobId::new(),
            job_type,
            batch_id,
            status: SyncJobStatus::Queued,
            metadata,
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn start(&mut self) -> DomainResult<()> {
        self.start_at(Utc::now())
    }

    pub fn start_at(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(SyncJobStatus::Running)?;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn complete(&mut self) -> DomainResult<()> {
        self.complete_at(Utc::now())
    }

    pub fn complete_at(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(SyncJobStatus::Completed)?;
        self.finished_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> DomainResult<()> {
        self.fail_at(reason, Utc::now())
    }

    /// Fail a running job, recording `reason` under [`ERROR_METADATA_KEY`].
    pub fn fail_at(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(SyncJobStatus::Failed)?;
        self.finished_at = Some(now);
        self.metadata
            .insert(ERROR_METADATA_KEY.to_string(), JsonValue::String(reason.into()));
        self.updated_at = now;
        Ok(())
    }

    /// Merge progress/diagnostic keys into the metadata (later keys win).
    pub fn merge_metadata(&mut self, extra: Map<String, JsonValue>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "sync job {} is {} and no longer accepts metadata",
                self.id, self.status
            )));
        }
        self.metadata.extend(extra);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Timestamp rules that must hold in every status.
    pub fn check_invariants(&self) -> DomainResult<()> {
        if self.status != SyncJobStatus::Queued && self.started_at.is_none() {
            return Err(DomainError::invariant(format!(
                "sync job {} is {} without started_at",
                self.id, self.status
            )));
        }
        if self.status.is_terminal() != self.finished_at.is_some() {
            return Err(DomainError::invariant(format!(
                "sync job {} is {} but finished_at is {}",
                self.id,
                self.status,
                if self.finished_at.is_some() { "set" } else { "unset" }
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: SyncJobStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::illegal_transition("sync job", self.status, next));
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn job() -> SyncJob {
        SyncJob::new(job_types::CATALOG, None, Map::new()).unwrap()
    }

    #[test]
    fn new_jobs_are_queued_without_timestamps() {
        let j = job();
        assert_eq!(j.status, SyncJobStatus::Queued);
        assert!(j.started_at.is_none());
        assert!(j.finished_at.is_none());
        j.check_invariants().unwrap();
    }

    #[test]
    fn blank_job_type_is_rejected() {
        assert!(SyncJob::new("  ", None, Map::new()).is_err());
    }

    #[test]
    fn happy_path_stamps_timestamps() {
        let mut j = job();
        j.start().unwrap();
        assert!(j.started_at.is_some());
        assert!(j.finished_at.is_none());
        j.check_invariants().unwrap();

        j.complete().unwrap();
        assert_eq!(j.status, SyncJobStatus::Completed);
        assert!(j.finished_at.is_some());
        assert!(j.started_at <= j.finished_at);
        j.check_invariants().unwrap();
    }

    #[test]
    fn completing_a_queued_job_is_rejected() {
        let mut j = job();
        assert!(j.complete().is_err());
        assert_eq!(j.status, SyncJobStatus::Queued);
    }

    #[test]
    fn a_job_that_never_ran_cannot_fail() {
        let mut j = job();
        assert!(j.fail("never ran").is_err());
        assert_eq!(j.status, SyncJobStatus::Queued);
        assert!(j.started_at.is_none());
        assert!(!j.metadata.contains_key(ERROR_METADATA_KEY));
    }

    #[test]
    fn failing_a_running_job_keeps_its_start_time() {
        let mut j = job();
        j.start().unwrap();
        let started = j.started_at;
        j.fail("catalog unreachable").unwrap();
        assert_eq!(j.status, SyncJobStatus::Failed);
        assert_eq!(j.started_at, started);
        assert!(j.started_at <= j.finished_at);
        assert_eq!(j.metadata[ERROR_METADATA_KEY], "catalog unreachable");
        j.check_invariants().unwrap();
    }

    #[test]
    fn terminal_jobs_reject_metadata() {
        let mut j = job();
        j.merge_metadata(json!({"processed": 3}).as_object().cloned().unwrap())
            .unwrap();
        j.start().unwrap();
        j.complete().unwrap();
        let extra = json!({"processed": 4}).as_object().cloned().unwrap();
        assert!(j.merge_metadata(extra).is_err());
        assert_eq!(j.metadata["processed"], 3);
    }

    #[test]
    fn status_parses_from_its_string_form() {
        for s in SyncJobStatus::ALL {
            assert_eq!(s.as_str().parse::<SyncJobStatus>().unwrap(), s);
        }
        assert!("cancelled".parse::<SyncJobStatus>().is_err());
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Start,
        Complete,
        Fail,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Start), Just(Op::Complete), Just(Op::Fail)]
    }

    proptest! {
        #[test]
        fn terminal_jobs_never_move(ops in proptest::collection::vec(op(), 0..12)) {
            let mut j = job();
            for op in ops {
                let before = j.clone();
                let result = match op {
                    Op::Start => j.start(),
                    Op::Complete => j.complete(),
                    Op::Fail => j.fail("boom"),
                };
                if before.status.is_terminal() {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(&j, &before);
                }
                // Only a running job may finish.
                if matches!(op, Op::Complete | Op::Fail) && result.is_ok() {
                    prop_assert_eq!(before.status, SyncJobStatus::Running);
                }
                if result.is_err() {
                    prop_assert_eq!(&j, &before);
                }
                prop_assert!(j.check_invariants().is_ok());
            }
        }
    }
}
