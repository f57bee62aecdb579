//! Events raised while ingesting channel webhooks.
//!
//! Both are immutable value objects: constructed once by the processor and
//! handed to the event sink.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use stocklink_core::{ChannelName, WebhookLogId};
use stocklink_events::Event;

use crate::product::Product;

/// Something arrived on a channel's webhook endpoint.
///
/// Raised for every request that got an audit row, whether or not the payload
/// later parses. `payload` is the decoded body, or empty when it did not decode
/// as a JSON object; the raw body lives in the audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookReceived {
    pub channel: ChannelName,
    pub payload: Map<String, JsonValue>,
    pub headers: BTreeMap<String, String>,
    pub audit_log_id: WebhookLogId,
    pub occurred_at: DateTime<Utc>,
}

/// A channel reported a new quantity for a product.
///
/// Raised only when the full pipeline (parse, fetch) succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryUpdated {
    pub channel: ChannelName,
    pub product: Product,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryUpdated {
    /// Signed change in stock, clamped to the `i64` range.
    pub fn delta(&self) -> i64 {
        self.new_quantity.saturating_sub(self.previous_quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    WebhookReceived(WebhookReceived),
    InventoryUpdated(InventoryUpdated),
}

impl ChannelEvent {
    pub fn channel(&self) -> &ChannelName {
        match self {
            ChannelEvent::WebhookReceived(e) => &e.channel,
            ChannelEvent::InventoryUpdated(e) => &e.channel,
        }
    }
}

impl Event for ChannelEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChannelEvent::WebhookReceived(_) => "channel.webhook.received",
            ChannelEvent::InventoryUpdated(_) => "channel.inventory.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ChannelEvent::WebhookReceived(e) => e.occurred_at,
            ChannelEvent::InventoryUpdated(e) => e.occurred_at,
        }
    }
}

impl From<WebhookReceived> for ChannelEvent {
    fn from(value: WebhookReceived) -> Self {
        ChannelEvent::WebhookReceived(value)
    }
}

impl From<InventoryUpdated> for ChannelEvent {
    fn from(value: InventoryUpdated) -> Self {
        ChannelEvent::InventoryUpdated(value)
    }
}
