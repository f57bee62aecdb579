//! Inventory channel integration: canonical product types, the per-channel
//! driver contract, the driver registry, and the events raised when a channel
//! reports a change.
//!
//! Everything channel-specific sits behind [`InventoryDriver`]; the rest of the
//! system only ever sees [`UpdatePayload`] and [`Product`].

pub mod catalog;
pub mod driver;
pub mod drivers;
pub mod events;
pub mod product;
pub mod registry;
pub mod webhook;

pub use catalog::{HttpCatalog, InMemoryCatalog, ProductCatalog};
pub use driver::{DriverError, InventoryDriver};
pub use drivers::{JsonDriver, JsonDriverConfig};
pub use events::{ChannelEvent, InventoryUpdated, WebhookReceived};
pub use product::{Product, RemoteId, UpdatePayload};
pub use registry::{DriverNotFound, DriverRegistry};
pub use webhook::{Topic, WebhookRequest};
