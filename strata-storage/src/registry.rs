//! Named tiers and stack assembly from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use strata_core::{CacheError, CacheResult, Clock, ConfigError, StackConfig, SystemClock};

use crate::layered::LayeredCacheStore;
use crate::store::Tier;

/// Registry of tiers available to stack configurations, keyed by name.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: HashMap<String, Tier>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, store: Tier) -> &mut Self {
        self.stores.insert(name.into(), store);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tier> {
        self.stores.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    /// Build a layered cache from `config` using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateTier` or `ConfigError::InvalidValue` if
    /// the config does not validate, and `ConfigError::UnknownStore` for a
    /// tier name that was never registered.
    pub fn build(&self, config: &StackConfig) -> CacheResult<LayeredCacheStore> {
        self.build_with_clock(config, Arc::new(SystemClock))
    }

    /// Build a layered cache from `config` whose expiry math uses `clock`.
    pub fn build_with_clock(
        &self,
        config: &StackConfig,
        clock: Arc<dyn Clock>,
    ) -> CacheResult<LayeredCacheStore> {
        config.validate()?;

        let tiers = config
            .tiers
            .iter()
            .map(|name| {
                self.stores.get(name).cloned().ok_or_else(|| {
                    CacheError::Config(ConfigError::UnknownStore { name: name.clone() })
                })
            })
            .collect::<CacheResult<Vec<_>>>()?;

        Ok(LayeredCacheStore::with_clock(tiers, clock))
    }
}
