//! Where drivers look up current product state.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::driver::DriverError;
use crate::product::{Product, RemoteId};

/// Read access to a channel's product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product(&self, remote_id: &RemoteId) -> Result<Product, DriverError>;
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<RemoteId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::new();
        for p in products {
            catalog.upsert(p);
        }
        catalog
    }

    pub fn upsert(&self, product: Product) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.remote_id.clone(), product);
        }
    }

    pub fn remove(&self, remote_id: &RemoteId) -> Option<Product> {
        self.products.write().ok()?.remove(remote_id)
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn product(&self, remote_id: &RemoteId) -> Result<Product, DriverError> {
        let products = self
            .products
            .read()
            .map_err(|_| DriverError::transport("catalog lock poisoned"))?;
        products
            .get(remote_id)
            .cloned()
            .ok_or_else(|| DriverError::ProductNotFound(remote_id.clone()))
    }
}

/// Catalog served over HTTP: `GET {base_url}/products/{remote_id}`.
///
/// The response must be a JSON object. `quantity_pointer` locates the on-hand
/// quantity; `sku` and `name` are read from the top level when present. The
/// whole object is kept as the product's attributes.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
    quantity_pointer: String,
    timeout: Duration,
}

impl HttpCatalog {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        quantity_pointer: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DriverError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DriverError::transport(format!("invalid catalog url `{base_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DriverError::transport(format!(
                "catalog url `{base_url}` cannot be used as a base"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriverError::transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_token,
            quantity_pointer: quantity_pointer.into(),
            timeout,
        })
    }

    fn product_url(&self, remote_id: &RemoteId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("products").push(remote_id.as_str());
        }
        url
    }

    fn map_send_error(&self, err: reqwest::Error) -> DriverError {
        if err.is_timeout() {
            DriverError::Timeout(self.timeout)
        } else {
            DriverError::transport(err.to_string())
        }
    }
}

#[async_trait]
impl ProductCatalog for HttpCatalog {
    async fn product(&self, remote_id: &RemoteId) -> Result<Product, DriverError> {
        let url = self.product_url(remote_id);
        debug!(%url, "fetching product from channel catalog");

        let mut request = self.client.get(url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(DriverError::ProductNotFound(remote_id.clone())),
            status if !status.is_success() => {
                return Err(DriverError::transport(format!("catalog responded {status}")));
            }
            _ => {}
        }

        let body: JsonValue = response.json().await.map_err(|e| {
            if e.is_timeout() {
                DriverError::Timeout(self.timeout)
            } else {
                DriverError::decode(e.to_string())
            }
        })?;

        product_from_json(remote_id, body, &self.quantity_pointer)
    }
}

fn product_from_json(
    remote_id: &RemoteId,
    body: JsonValue,
    quantity_pointer: &str,
) -> Result<Product, DriverError> {
    let quantity = match body.pointer(quantity_pointer) {
        None | Some(JsonValue::Null) => None,
        Some(v) => Some(v.as_i64().ok_or_else(|| {
            DriverError::decode(format!("`{quantity_pointer}` is not an integer: {v}"))
        })?),
    };

    let JsonValue::Object(attributes) = body else {
        return Err(DriverError::decode("product response is not a JSON object"));
    };

    let text = |key: &str| attributes.get(key).and_then(JsonValue::as_str).map(str::to_string);
    let sku = text("sku");
    let name = text("name");

    Ok(Product {
        remote_id: remote_id.clone(),
        sku,
        name,
        quantity,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn id(raw: &str) -> RemoteId {
        RemoteId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn in_memory_catalog_returns_stored_products() {
        let catalog = InMemoryCatalog::with_products([Product::new(id("A")).with_quantity(3)]);
        assert_eq!(catalog.product(&id("A")).await.unwrap().quantity, Some(3));
        assert_eq!(
            catalog.product(&id("B")).await.unwrap_err(),
            DriverError::ProductNotFound(id("B"))
        );

        catalog.remove(&id("A"));
        assert!(catalog.product(&id("A")).await.is_err());
    }

    #[test]
    fn product_urls_escape_the_remote_id() {
        let catalog = HttpCatalog::new(
            "https://catalog.example.com/api/",
            None,
            "/quantity",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            catalog.product_url(&id("a/b c")).as_str(),
            "https://catalog.example.com/api/products/a%2Fb%20c"
        );
    }

    #[test]
    fn invalid_base_urls_are_rejected() {
        assert!(HttpCatalog::new("not a url", None, "/q", Duration::from_secs(1)).is_err());
        assert!(HttpCatalog::new("mailto:ops@example.com", None, "/q", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn product_json_maps_quantity_and_text_fields() {
        let body = json!({"sku": "S-1", "name": "Mug", "stock": {"on_hand": 12}});
        let p = product_from_json(&id("77"), body, "/stock/on_hand").unwrap();
        assert_eq!(p.quantity, Some(12));
        assert_eq!(p.sku.as_deref(), Some("S-1"));
        assert_eq!(p.name.as_deref(), Some("Mug"));
        assert!(p.attributes.contains_key("stock"));
    }

    #[test]
    fn product_json_without_quantity_is_not_an_error() {
        let p = product_from_json(&id("77"), json!({"name": "Mug"}), "/quantity").unwrap();
        assert_eq!(p.quantity, None);
    }

    #[test]
    fn product_json_rejects_non_objects_and_bad_quantities() {
        assert!(product_from_json(&id("1"), json!([1]), "/quantity").is_err());
        assert!(product_from_json(&id("1"), json!({"quantity": "many"}), "/quantity").is_err());
    }
}
