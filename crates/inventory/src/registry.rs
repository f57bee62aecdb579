use std::collections::BTreeMap;
use std::sync::Arc;

use stocklink_core::ChannelName;

use crate::driver::InventoryDriver;

/// No driver is registered under the requested channel name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no inventory driver registered for channel `{channel}`")]
pub struct DriverNotFound {
    pub channel: String,
}

/// Channel name → driver lookup.
///
/// Built once at startup and then only read, so resolution is pure and
/// deterministic for a given process configuration.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<ChannelName, Arc<dyn InventoryDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver` under `channel`, returning the driver it replaced.
    pub fn register(
        &mut self,
        channel: ChannelName,
        driver: Arc<dyn InventoryDriver>,
    ) -> Option<Arc<dyn InventoryDriver>> {
        self.drivers.insert(channel, driver)
    }

    pub fn with_driver(mut self, channel: ChannelName, driver: Arc<dyn InventoryDriver>) -> Self {
        self.register(channel, driver);
        self
    }

    /// Resolve the driver for a raw channel name (as it arrived on the route).
    ///
    /// Names that are not valid channel names resolve to `DriverNotFound` as well.
    pub fn resolve(&self, channel: &str) -> Result<Arc<dyn InventoryDriver>, DriverNotFound> {
        self.resolve_named(channel).map(|(_, driver)| driver)
    }

    /// Like [`resolve`](Self::resolve), also returning the normalized name.
    pub fn resolve_named(
        &self,
        channel: &str,
    ) -> Result<(ChannelName, Arc<dyn InventoryDriver>), DriverNotFound> {
        ChannelName::parse(channel)
            .ok()
            .and_then(|name| {
                let driver = self.drivers.get(&name).cloned()?;
                Some((name, driver))
            })
            .ok_or_else(|| DriverNotFound {
                channel: channel.to_string(),
            })
    }

    /// Registered channel names, sorted.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelName> {
        self.drivers.keys()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl core::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("channels", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::drivers::{JsonDriver, JsonDriverConfig};

    fn registry() -> DriverRegistry {
        let catalog = Arc::new(InMemoryCatalog::new());
        DriverRegistry::new()
            .with_driver(
                ChannelName::parse("shopify").unwrap(),
                Arc::new(JsonDriver::new(JsonDriverConfig::shopify(), catalog.clone())),
            )
            .with_driver(
                ChannelName::parse("woocommerce").unwrap(),
                Arc::new(JsonDriver::new(JsonDriverConfig::woocommerce(), catalog)),
            )
    }

    #[test]
    fn known_channels_resolve_case_insensitively() {
        let reg = registry();
        assert!(reg.resolve("shopify").is_ok());
        assert!(reg.resolve("WooCommerce").is_ok());
    }

    #[test]
    fn unknown_channel_reports_the_requested_name() {
        let err = registry().resolve("amazon").err().unwrap();
        assert_eq!(err.channel, "amazon");
        assert!(err.to_string().contains("amazon"));
    }

    #[test]
    fn resolve_named_normalizes_the_channel() {
        let (name, _) = registry().resolve_named("  Shopify ").unwrap();
        assert_eq!(name.as_str(), "shopify");
    }

    #[test]
    fn channels_are_listed_in_order() {
        let reg = registry();
        let names: Vec<_> = reg.channels().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["shopify", "woocommerce"]);
    }

    #[test]
    fn re_registering_replaces_the_driver() {
        let mut reg = registry();
        let replaced = reg.register(
            ChannelName::parse("shopify").unwrap(),
            Arc::new(JsonDriver::new(
                JsonDriverConfig::generic(),
                Arc::new(InMemoryCatalog::new()),
            )),
        );
        assert!(replaced.is_some());
        assert_eq!(reg.len(), 2);
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(name in "[a-zA-Z0-9_/ -]{0,16}") {
            let reg = registry();
            let first = reg.resolve(&name).is_ok();
            let second = reg.resolve(&name).is_ok();
            prop_assert_eq!(first, second);
            let known = matches!(name.trim().to_ascii_lowercase().as_str(), "shopify" | "woocommerce");
            prop_assert_eq!(first, known);
        }
    }
}
