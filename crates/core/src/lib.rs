//! `stocklink-core` — shared building blocks for the ingestion pipeline.
//!
//! This crate contains **pure** primitives (no IO, no async, no storage).

pub mod channel;
pub mod error;
pub mod id;
pub mod value_object;

pub use channel::ChannelName;
pub use error::{DomainError, DomainResult};
pub use id::{BatchId, SyncJobId, WebhookLogId};
pub use value_object::ValueObject;
