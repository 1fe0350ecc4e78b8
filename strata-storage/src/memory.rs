//! In-process table tier.
//!
//! A fixed-capacity map guarded by an `RwLock`, usable as the fastest tier of
//! a stack or on its own in tests. Rows carry their own expiry, checked against
//! the store's [`Clock`] on every read.
//!
//! # Limits
//!
//! - A payload whose serialized form exceeds `max_value_bytes` is refused
//!   (`Ok(false)`), the same way a fixed-width table column would refuse it.
//! - Inserting a new key into a full table first purges expired rows; if the
//!   table is still full the write is refused.
//! - `put` with a zero or negative TTL stores nothing: the key is removed and
//!   the call reports success, since the value would already be expired.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use strata_core::{
    CacheError, CacheResult, Clock, Expiry, MemoryStoreConfig, Payload, StoreError, SystemClock,
    TtlSeconds,
};
use tracing::warn;

use crate::store::BackingStore;

const STORE_NAME: &str = "memory";

#[derive(Debug, Clone)]
struct Row {
    payload: Payload,
    expiry: Expiry,
}

/// Fixed-capacity in-process tier.
pub struct MemoryStore {
    config: MemoryStoreConfig,
    clock: Arc<dyn Clock>,
    rows: RwLock<HashMap<String, Row>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            config: MemoryStoreConfig::default(),
            clock: Arc::new(SystemClock),
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl MemoryStore {
    /// Create a store using the system clock.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the configuration is invalid.
    pub fn new(config: MemoryStoreConfig) -> CacheResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store that checks expiry against `clock`.
    pub fn with_clock(config: MemoryStoreConfig, clock: Arc<dyn Clock>) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            rows: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Number of live (unexpired) rows.
    pub fn len(&self) -> CacheResult<usize> {
        let now = self.clock.now();
        Ok(self
            .read_rows()?
            .values()
            .filter(|row| !row.expiry.is_expired(now))
            .count())
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// TTL bookkeeping for `key`.
    ///
    /// `None` if the key is absent or expired, `Some(None)` for a row that
    /// never expires, `Some(Some(secs))` for the seconds left.
    pub fn ttl_of(&self, key: &str) -> CacheResult<Option<Option<TtlSeconds>>> {
        let now = self.clock.now();
        Ok(self
            .read_rows()?
            .get(key)
            .filter(|row| !row.expiry.is_expired(now))
            .map(|row| row.expiry.remaining(now)))
    }

    fn read_rows(&self) -> CacheResult<RwLockReadGuard<'_, HashMap<String, Row>>> {
        self.rows.read().map_err(|_| poisoned())
    }

    fn write_rows(&self) -> CacheResult<RwLockWriteGuard<'_, HashMap<String, Row>>> {
        self.rows.write().map_err(|_| poisoned())
    }

    fn insert(&self, key: &str, payload: Payload, expiry: Expiry) -> CacheResult<bool> {
        let size = serde_json::to_vec(&payload)
            .map_err(|e| {
                CacheError::Store(StoreError::Serialization {
                    reason: e.to_string(),
                })
            })?
            .len();
        if size > self.config.max_value_bytes {
            warn!(
                key,
                size,
                limit = self.config.max_value_bytes,
                "value too large for memory store"
            );
            return Ok(false);
        }

        let mut rows = self.write_rows()?;
        if !rows.contains_key(key) && rows.len() >= self.config.capacity {
            let now = self.clock.now();
            rows.retain(|_, row| !row.expiry.is_expired(now));
            if rows.len() >= self.config.capacity {
                warn!(key, capacity = self.config.capacity, "memory store full");
                return Ok(false);
            }
        }

        rows.insert(key.to_string(), Row { payload, expiry });
        Ok(true)
    }
}

impl BackingStore for MemoryStore {
    fn get(&self, key: &str) -> CacheResult<Option<Payload>> {
        let now = self.clock.now();
        Ok(self
            .read_rows()?
            .get(key)
            .filter(|row| !row.expiry.is_expired(now))
            .map(|row| row.payload.clone()))
    }

    fn put(&self, key: &str, payload: Payload, ttl_seconds: TtlSeconds) -> CacheResult<bool> {
        if ttl_seconds <= 0 {
            self.write_rows()?.remove(key);
            return Ok(true);
        }
        let expiry = Expiry::after(self.clock.now(), ttl_seconds);
        self.insert(key, payload, expiry)
    }

    fn forever(&self, key: &str, payload: Payload) -> CacheResult<bool> {
        self.insert(key, payload, Expiry::Never)
    }

    fn forget(&self, key: &str) -> CacheResult<bool> {
        self.write_rows()?.remove(key);
        Ok(true)
    }

    fn flush(&self) -> CacheResult<bool> {
        self.write_rows()?.clear();
        Ok(true)
    }
}

fn poisoned() -> CacheError {
    CacheError::Store(StoreError::LockPoisoned {
        store: STORE_NAME.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta};
    use serde_json::json;
    use std::sync::Mutex;
    use strata_core::Timestamp;

    struct StepClock(Mutex<Timestamp>);

    impl StepClock {
        fn starting_at(secs: i64) -> Arc<Self> {
            Arc::new(Self(Mutex::new(
                DateTime::from_timestamp(secs, 0).expect("valid timestamp"),
            )))
        }

        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now += TimeDelta::seconds(secs);
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> Timestamp {
            *self.0.lock().unwrap()
        }
    }

    fn store_with(config: MemoryStoreConfig, clock: Arc<StepClock>) -> MemoryStore {
        MemoryStore::with_clock(config, clock).expect("valid config")
    }

    #[test]
    fn test_put_then_get() {
        let store = MemoryStore::default();
        assert!(store.put("k", json!("v"), 60).unwrap());
        assert_eq!(store.get("k").unwrap(), Some(json!("v")));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_rows_expire_against_clock() {
        let clock = StepClock::starting_at(1_000);
        let store = store_with(MemoryStoreConfig::default(), clock.clone());

        store.put("k", json!(1), 10).unwrap();
        assert_eq!(store.ttl_of("k").unwrap(), Some(Some(10)));

        clock.advance(4);
        assert_eq!(store.ttl_of("k").unwrap(), Some(Some(6)));

        clock.advance(6);
        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.ttl_of("k").unwrap(), None);
    }

    #[test]
    fn test_non_positive_ttl_removes_and_succeeds() {
        let store = MemoryStore::default();
        store.forever("k", json!(1)).unwrap();

        assert!(store.put("k", json!(2), 0).unwrap());
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.put("other", json!(3), -5).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_forever_has_no_ttl() {
        let store = MemoryStore::default();
        store.forever("k", json!(1)).unwrap();
        assert_eq!(store.ttl_of("k").unwrap(), Some(None));
    }

    #[test]
    fn test_oversized_value_refused() {
        let config = MemoryStoreConfig::default().with_max_value_bytes(8);
        let store = MemoryStore::new(config).unwrap();

        assert!(store.forever("small", json!(1)).unwrap());
        assert!(!store.forever("big", json!("much longer than eight bytes")).unwrap());
        assert_eq!(store.get("big").unwrap(), None);
    }

    #[test]
    fn test_full_table_purges_expired_rows_first() {
        let clock = StepClock::starting_at(0);
        let config = MemoryStoreConfig::default().with_capacity(2);
        let store = store_with(config, clock.clone());

        store.put("a", json!(1), 5).unwrap();
        store.forever("b", json!(2)).unwrap();
        assert!(!store.forever("c", json!(3)).unwrap());

        clock.advance(5);
        assert!(store.forever("c", json!(3)).unwrap());
        assert_eq!(store.get("c").unwrap(), Some(json!(3)));
    }

    #[test]
    fn test_full_table_still_accepts_overwrite() {
        let config = MemoryStoreConfig::default().with_capacity(1);
        let store = MemoryStore::new(config).unwrap();

        store.forever("a", json!(1)).unwrap();
        assert!(store.forever("a", json!(2)).unwrap());
        assert_eq!(store.get("a").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_forget_and_flush() {
        let store = MemoryStore::default();
        store.forever("a", json!(1)).unwrap();
        store.forever("b", json!(2)).unwrap();

        assert!(store.forget("a").unwrap());
        assert!(store.forget("missing").unwrap());
        assert_eq!(store.get("a").unwrap(), None);

        assert!(store.flush().unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MemoryStoreConfig::default().with_capacity(0);
        assert!(MemoryStore::new(config).is_err());
    }
}
