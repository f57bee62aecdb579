use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Channel-defined webhook topic (e.g. `inventory_levels/update`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inbound webhook as handed over by the transport layer (already verified).
///
/// Body and headers are captured as-is; nothing here validates them. Header
/// names are stored lowercase so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookRequest {
    body: Vec<u8>,
    headers: BTreeMap<String, String>,
}

impl WebhookRequest {
    pub fn new<I, K, V>(body: impl Into<Vec<u8>>, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let value = value.into();
            map.entry(name.as_ref().to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        Self {
            body: body.into(),
            headers: map,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Best-effort decode of the body as a JSON object.
    ///
    /// Returns `None` when the body is not JSON or is JSON but not an object.
    pub fn decode_object(&self) -> Option<Map<String, JsonValue>> {
        match serde_json::from_slice::<JsonValue>(&self.body) {
            Ok(JsonValue::Object(map)) => Some(map),
            _ => None,
        }
    }
}
