//! Webhook audit log: one row per inbound notification plus its outcome.
//!
//! ## Lifecycle
//!
//! ```text
//! insert ──▶ pending ──▶ processed
//!                    └─▶ failed (with failure detail)
//! ```
//!
//! A row leaves `pending` exactly once and is never re-opened or deleted by the
//! pipeline. Stores enforce this at write time (`AlreadyTerminal`), not just
//! the in-process model.

pub mod in_memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use in_memory::InMemoryWebhookLogStore;
pub use postgres::PostgresWebhookLogStore;
pub use store::{WebhookLogFilter, WebhookLogStore, WebhookLogStoreError};
pub use types::{NewWebhookLog, RawPayload, WebhookLog, WebhookLogStatus, WebhookOutcome};
