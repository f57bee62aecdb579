use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use stocklink_core::{DomainError, ValueObject};

/// A product's identifier on the remote channel (opaque to us).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::validation("remote id cannot be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for RemoteId {}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RemoteId> for String {
    fn from(value: RemoteId) -> Self {
        value.0
    }
}

impl core::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical update parsed out of a channel webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    pub remote_id: RemoteId,
    /// New on-hand quantity reported by the channel.
    pub quantity: i64,
    /// Channel fields we do not model, kept for consumers.
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
}

/// Canonical view of a product as currently known by the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub remote_id: RemoteId,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// `None` when the channel's representation carries no quantity at all.
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
}

impl Product {
    pub fn new(remote_id: RemoteId) -> Self {
        Self {
            remote_id,
            sku: None,
            name: None,
            quantity: None,
            attributes: Map::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Quantity to report as "previous"; zero only when the field is absent.
    pub fn quantity_or_zero(&self) -> i64 {
        self.quantity.unwrap_or(0)
    }
}
