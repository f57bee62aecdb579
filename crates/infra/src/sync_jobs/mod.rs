//! Sync-job tracking: lifecycle records for bulk synchronization work.
//!
//! ```text
//! queued ──▶ running ──▶ completed
//!    │          └──────▶ failed
//!    └─────────────────▶ failed
//! ```
//!
//! Jobs are created by whatever builds a bulk sync and driven by a single
//! executor through [`SyncJobTracker`]. Stores apply every write as a
//! compare-and-set on status.

pub mod postgres;
pub mod store;
pub mod tracker;
pub mod types;

pub use postgres::PostgresSyncJobStore;
pub use store::{InMemorySyncJobStore, SyncJobStats, SyncJobStore, SyncJobStoreError};
pub use tracker::SyncJobTracker;
pub use types::{ERROR_METADATA_KEY, SyncJob, SyncJobStatus, job_types};
