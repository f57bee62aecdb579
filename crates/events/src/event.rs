use chrono::{DateTime, Utc};

/// Contract for anything published on an [`EventBus`](crate::EventBus).
///
/// Events are facts: built once, never edited. `event_type` plus `version`
/// identify the payload schema for external consumers.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted name, e.g. `channel.inventory.updated`.
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}
