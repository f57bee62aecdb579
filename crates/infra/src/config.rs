//! Process configuration from the environment (and `.env`).
//!
//! | Variable                 | Meaning                                     | Default        |
//! |--------------------------|---------------------------------------------|----------------|
//! | `BIND_ADDRESS`           | HTTP listen address                         | `0.0.0.0:8080` |
//! | `DATABASE_URL`           | Postgres; in-memory stores when unset       | unset          |
//! | `CHANNELS`               | comma-separated channel names               | empty          |
//! | `<NAME>_CATALOG_URL`     | product catalog base URL (required)         |                |
//! | `<NAME>_API_TOKEN`       | bearer token for the catalog                | unset          |
//! | `<NAME>_PRESET`          | `shopify`, `woocommerce` or `generic`       | see below      |
//! | `<NAME>_TIMEOUT_SECS`    | catalog request timeout                     | `10`           |
//!
//! `<NAME>` is the channel name upper-cased with `-` replaced by `_`. Without
//! an explicit preset, a channel named after a preset uses it; anything else
//! gets `generic`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use stocklink_core::ChannelName;
use stocklink_inventory::{DriverRegistry, HttpCatalog, JsonDriver, JsonDriverConfig};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

impl ConfigError {
    fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub name: ChannelName,
    pub driver: JsonDriverConfig,
    pub catalog_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_address: SocketAddr,
    pub database_url: Option<String>,
    pub channels: Vec<ChannelConfig>,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_raw
            .parse()
            .map_err(|e| ConfigError::invalid("BIND_ADDRESS", format!("`{bind_raw}`: {e}")))?;

        let mut channels: Vec<ChannelConfig> = Vec::new();
        for raw in get("CHANNELS").unwrap_or_default().split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let name = ChannelName::parse(raw)
                .map_err(|e| ConfigError::invalid("CHANNELS", e.to_string()))?;
            if channels.iter().any(|c| c.name == name) {
                return Err(ConfigError::invalid(
                    "CHANNELS",
                    format!("channel `{name}` listed twice"),
                ));
            }
            channels.push(channel_config(name, &get)?);
        }

        Ok(Self {
            bind_address,
            database_url: get("DATABASE_URL"),
            channels,
        })
    }
}

fn channel_config<G>(name: ChannelName, get: &G) -> Result<ChannelConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let prefix = name.env_prefix();

    let catalog_key = format!("{prefix}_CATALOG_URL");
    let catalog_url = get(&catalog_key).ok_or(ConfigError::Missing(catalog_key))?;

    let preset_key = format!("{prefix}_PRESET");
    let driver = match get(&preset_key) {
        Some(preset) => JsonDriverConfig::preset(&preset)
            .ok_or_else(|| ConfigError::invalid(&preset_key, format!("unknown preset `{preset}`")))?,
        None => JsonDriverConfig::preset(name.as_str()).unwrap_or_else(JsonDriverConfig::generic),
    };

    let timeout_key = format!("{prefix}_TIMEOUT_SECS");
    let timeout_secs = match get(&timeout_key) {
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::invalid(&timeout_key, format!("`{raw}` is not a positive integer")))?,
        None => DEFAULT_TIMEOUT_SECS,
    };

    Ok(ChannelConfig {
        api_token: get(&format!("{prefix}_API_TOKEN")),
        name,
        driver,
        catalog_url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

/// One HTTP-catalog-backed JSON driver per configured channel.
pub fn build_registry(channels: &[ChannelConfig]) -> Result<DriverRegistry, ConfigError> {
    let mut registry = DriverRegistry::new();
    for channel in channels {
        let catalog = HttpCatalog::new(
            &channel.catalog_url,
            channel.api_token.clone(),
            channel.driver.quantity_pointer.clone(),
            channel.timeout,
        )
        .map_err(|e| {
            ConfigError::invalid(format!("{}_CATALOG_URL", channel.name.env_prefix()), e.to_string())
        })?;

        registry.register(
            channel.name.clone(),
            Arc::new(JsonDriver::new(channel.driver.clone(), Arc::new(catalog))),
        );
        info!(channel = %channel.name, catalog_url = %channel.catalog_url, "channel driver registered");
    }
    Ok(registry)
}
