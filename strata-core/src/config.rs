//! Configuration types

use crate::{CacheError, CacheResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// STACK CONFIGURATION
// ============================================================================

/// Ordered list of tier names making up a layered cache.
///
/// Names are resolved against a store registry when the cache is built. The
/// first name is the fastest, most local tier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackConfig {
    pub tiers: Vec<String>,
}

impl StackConfig {
    pub fn new<I, S>(tiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tiers: tiers.into_iter().map(Into::into).collect(),
        }
    }

    /// Create from environment variables.
    ///
    /// Environment variables:
    /// - `STRATA_STACK_TIERS`: comma-separated tier names, fastest first
    ///
    /// Returns an empty stack when the variable is unset.
    pub fn from_env() -> Self {
        std::env::var("STRATA_STACK_TIERS")
            .map(|raw| Self::parse_list(&raw))
            .unwrap_or_default()
    }

    /// Parse a comma-separated tier list, trimming whitespace around names.
    pub fn parse_list(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - no tier name is blank
    /// - no tier name appears twice
    ///
    /// An empty tier list is valid.
    pub fn validate(&self) -> CacheResult<()> {
        let mut seen = HashSet::new();
        for name in &self.tiers {
            if name.trim().is_empty() {
                return Err(CacheError::Config(ConfigError::InvalidValue {
                    field: "tiers".to_string(),
                    value: format!("{:?}", name),
                    reason: "tier names must not be blank".to_string(),
                }));
            }
            if !seen.insert(name.as_str()) {
                return Err(CacheError::Config(ConfigError::DuplicateTier {
                    name: name.clone(),
                }));
            }
        }
        Ok(())
    }
}

// ============================================================================
// IN-PROCESS TIER CONFIGURATION
// ============================================================================

/// Sizing for the in-process table tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Maximum number of rows held at once
    pub capacity: usize,
    /// Maximum serialized size of a single payload, in bytes
    pub max_value_bytes: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            max_value_bytes: 8192,
        }
    }
}

impl MemoryStoreConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `STRATA_MEMORY_CAPACITY`: maximum rows (default: 1024)
    /// - `STRATA_MEMORY_MAX_VALUE_BYTES`: maximum payload size (default: 8192)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            capacity: std::env::var("STRATA_MEMORY_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.capacity),
            max_value_bytes: std::env::var("STRATA_MEMORY_MAX_VALUE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_value_bytes),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_value_bytes(mut self, max_value_bytes: usize) -> Self {
        self.max_value_bytes = max_value_bytes;
        self
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(CacheError::Config) if invalid.
    pub fn validate(&self) -> CacheResult<()> {
        if self.capacity == 0 {
            return Err(CacheError::Config(ConfigError::InvalidValue {
                field: "capacity".to_string(),
                value: self.capacity.to_string(),
                reason: "capacity must be greater than 0".to_string(),
            }));
        }

        if self.max_value_bytes == 0 {
            return Err(CacheError::Config(ConfigError::InvalidValue {
                field: "max_value_bytes".to_string(),
                value: self.max_value_bytes.to_string(),
                reason: "max_value_bytes must be greater than 0".to_string(),
            }));
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
