use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::catalog::ProductCatalog;
use crate::driver::{DriverError, InventoryDriver};
use crate::product::{Product, RemoteId, UpdatePayload};
use crate::webhook::{Topic, WebhookRequest};

/// Where a JSON-bodied channel puts the fields we need.
///
/// Pointers use RFC 6901 syntax (`/inventory_item_id`, `/stock/available`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonDriverConfig {
    pub topic_header: String,
    pub remote_id_pointer: String,
    pub quantity_pointer: String,
}

impl JsonDriverConfig {
    /// Shopify `inventory_levels/update` webhooks.
    pub fn shopify() -> Self {
        Self {
            topic_header: "x-shopify-topic".into(),
            remote_id_pointer: "/inventory_item_id".into(),
            quantity_pointer: "/available".into(),
        }
    }

    /// WooCommerce `product.updated` webhooks.
    pub fn woocommerce() -> Self {
        Self {
            topic_header: "x-wc-webhook-topic".into(),
            remote_id_pointer: "/id".into(),
            quantity_pointer: "/stock_quantity".into(),
        }
    }

    pub fn generic() -> Self {
        Self {
            topic_header: "x-webhook-topic".into(),
            remote_id_pointer: "/remote_id".into(),
            quantity_pointer: "/quantity".into(),
        }
    }

    /// Look up a preset by name (`shopify`, `woocommerce`, `generic`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "shopify" => Some(Self::shopify()),
            "woocommerce" => Some(Self::woocommerce()),
            "generic" => Some(Self::generic()),
            _ => None,
        }
    }
}

/// Driver for channels that post JSON objects and expose a product catalog.
pub struct JsonDriver {
    config: JsonDriverConfig,
    catalog: Arc<dyn ProductCatalog>,
}

impl JsonDriver {
    pub fn new(config: JsonDriverConfig, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &JsonDriverConfig {
        &self.config
    }
}

impl core::fmt::Debug for JsonDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JsonDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InventoryDriver for JsonDriver {
    fn extract_webhook_topic(&self, request: &WebhookRequest) -> Topic {
        request
            .header(&self.config.topic_header)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Topic::new)
            .unwrap_or_else(Topic::unknown)
    }

    fn parse_webhook_payload(&self, request: &WebhookRequest) -> Result<UpdatePayload, DriverError> {
        let body: JsonValue = serde_json::from_slice(request.body())
            .map_err(|e| DriverError::parse(format!("body is not valid JSON: {e}")))?;

        let remote_id = remote_id_at(&body, &self.config.remote_id_pointer)?;
        let quantity = quantity_at(&body, &self.config.quantity_pointer)?;

        let JsonValue::Object(attributes) = body else {
            return Err(DriverError::parse("body is not a JSON object"));
        };

        Ok(UpdatePayload {
            remote_id,
            quantity,
            attributes,
        })
    }

    async fn fetch_product(&self, remote_id: &RemoteId) -> Result<Product, DriverError> {
        self.catalog.product(remote_id).await
    }
}

fn remote_id_at(body: &JsonValue, pointer: &str) -> Result<RemoteId, DriverError> {
    let raw = match body.pointer(pointer) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) if n.is_u64() || n.is_i64() => n.to_string(),
        Some(other) => {
            return Err(DriverError::parse(format!(
                "`{pointer}` must be a string or integer, got {other}"
            )));
        }
        None => return Err(DriverError::parse(format!("missing `{pointer}`"))),
    };
    RemoteId::new(raw).map_err(|e| DriverError::parse(format!("`{pointer}`: {e}")))
}

fn quantity_at(body: &JsonValue, pointer: &str) -> Result<i64, DriverError> {
    match body.pointer(pointer) {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .ok_or_else(|| DriverError::parse(format!("`{pointer}` must be an integer, got {n}"))),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| DriverError::parse(format!("`{pointer}` must be an integer, got \"{s}\""))),
        Some(other) => Err(DriverError::parse(format!(
            "`{pointer}` must be an integer, got {other}"
        ))),
        None => Err(DriverError::parse(format!("missing `{pointer}`"))),
    }
}
