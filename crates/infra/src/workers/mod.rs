//! Background workers fed by the event bus.

pub mod event_log_worker;

pub use event_log_worker::{EventWorker, WorkerHandle, log_channel_event};
