//! Infrastructure: audit-log and sync-job persistence, the webhook processor
//! that ties drivers, audit log and event bus together, configuration, and
//! background workers.

pub mod audit_log;
pub mod config;
pub mod schema;
pub mod sync_jobs;
pub mod webhook_processor;
pub mod workers;

pub use config::{AppConfig, ChannelConfig, ConfigError, build_registry};
pub use webhook_processor::{ProcessingError, WebhookProcessor};
