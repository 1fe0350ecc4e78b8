//! Layered cache over an ordered list of tiers.
//!
//! # Reads
//!
//! The first tier holding the key answers. Every tier in front of it receives
//! a copy whose TTL is recomputed from the record's absolute expiry; the hit
//! tier and everything behind it are left alone. A miss everywhere writes
//! nothing.
//!
//! # Writes
//!
//! `put`, `forever`, `increment` and `decrement` run an atomic cascade: the
//! first tier that refuses aborts the write and every tier in front of it is
//! rolled back with `forget`. `forget` and `flush` sweep every tier and always
//! report success.
//!
//! # Concurrency
//!
//! Each call runs synchronously on the caller's thread. Nothing serializes two
//! callers working on the same key; tiers are individually responsible for
//! their own thread safety.
//!
//! # Example
//!
//! ```ignore
//! let fast: Tier = Arc::new(MemoryStore::default());
//! let slow: Tier = Arc::new(remote_store);
//! let cache = LayeredCacheStore::new(vec![fast, slow]);
//!
//! cache.put("greeting", json!("hello"), Some(Duration::from_secs(60)))?;
//! assert_eq!(cache.get("greeting")?, Some(json!("hello")));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use strata_core::{CacheResult, Clock, Record, SystemClock, TtlSeconds, ValueError};
use tracing::{debug, trace};

use crate::cascade::{atomic_cascade, best_effort_cascade, CascadeOutcome, SweepOutcome};
use crate::chain::TierChain;
use crate::normalize::{read_record, write_record};
use crate::store::{BackingStore, Tier};

/// One logical cache composed of ordered tiers, fastest first.
#[derive(Clone)]
pub struct LayeredCacheStore {
    tiers: Vec<Tier>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for LayeredCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredCacheStore")
            .field("tiers", &self.tiers.len())
            .finish()
    }
}

impl LayeredCacheStore {
    /// Create a layered cache using the system clock.
    ///
    /// An empty tier list is allowed: reads always miss and writes succeed
    /// vacuously.
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self::with_clock(tiers, Arc::new(SystemClock))
    }

    /// Create a layered cache whose expiry math uses `clock`.
    pub fn with_clock(tiers: Vec<Tier>, clock: Arc<dyn Clock>) -> Self {
        Self { tiers, clock }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Key prefix applied by the layered cache. Always empty: prefixing is
    /// each tier's own concern.
    pub fn prefix(&self) -> &str {
        ""
    }

    fn chain(&self) -> TierChain<'_> {
        TierChain::new(&self.tiers)
    }

    // === Reads ===

    /// Get the value stored under `key`, promoting it into shallower tiers.
    pub fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        Ok(self.record(key)?.map(|record| record.value))
    }

    /// Get several keys, one read traversal per key.
    pub fn many<'k, I>(&self, keys: I) -> CacheResult<HashMap<String, Option<Value>>>
    where
        I: IntoIterator<Item = &'k str>,
    {
        keys.into_iter()
            .map(|key| self.get(key).map(|value| (key.to_string(), value)))
            .collect()
    }

    /// Read path returning the full record.
    ///
    /// A tier that holds the key answers without consulting deeper tiers. A
    /// tier that misses asks the tiers behind it and, on a hit, stores the
    /// record itself before passing it up. If that promotion is refused the
    /// read reports a miss.
    pub fn record(&self, key: &str) -> CacheResult<Option<Record>> {
        let clock = self.clock.as_ref();

        self.chain().run(
            |tier, next| -> CacheResult<Option<Record>> {
                if let Some(record) = read_record(tier.store, key)? {
                    trace!(tier = tier.index, key, "tier hit");
                    return Ok(Some(record));
                }

                let Some(deeper) = next.run()? else {
                    return Ok(None);
                };

                if write_record(tier.store, key, &deeper, clock)? {
                    debug!(tier = tier.index, key, "promoted record into shallower tier");
                    Ok(Some(deeper))
                } else {
                    debug!(tier = tier.index, key, "promotion refused");
                    Ok(None)
                }
            },
            || Ok(None),
        )
    }

    // === Writes ===

    /// Store `value` under `key` on every tier.
    ///
    /// `ttl == None` stores without expiration. Sub-second precision is
    /// dropped.
    pub fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> CacheResult<bool> {
        let Some(ttl) = ttl else {
            return self.forever(key, value);
        };

        let record = Record::expiring_in(value, ttl_seconds(ttl), self.clock.now());
        self.put_record(key, &record)
    }

    /// Store each entry in turn, stopping at the first one that fails.
    ///
    /// Entries written before the failing one stay written.
    pub fn put_many<I, K>(&self, entries: I, ttl: Option<Duration>) -> CacheResult<bool>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        for (key, value) in entries {
            if !self.put(key.as_ref(), value, ttl)? {
                debug!(key = key.as_ref(), "put_many stopped at failing entry");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Store `value` under `key` with no expiration.
    pub fn forever(&self, key: &str, value: Value) -> CacheResult<bool> {
        self.put_record(key, &Record::forever(value))
    }

    /// Add `delta` to the integer stored under `key`.
    ///
    /// A missing key is created with value `delta` and no expiration. An
    /// existing record keeps its expiry. Returns `Ok(None)` if the write
    /// cascade was refused.
    ///
    /// # Errors
    ///
    /// `ValueError::NotNumeric` if the stored value is not an integer,
    /// `ValueError::Overflow` if the sum does not fit in an `i64`.
    pub fn increment(&self, key: &str, delta: i64) -> CacheResult<Option<i64>> {
        let Some(record) = self.record(key)? else {
            let created = self.forever(key, Value::from(delta))?;
            return Ok(created.then_some(delta));
        };

        let current = record
            .value
            .as_i64()
            .ok_or_else(|| ValueError::NotNumeric {
                key: key.to_string(),
            })?;
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| ValueError::Overflow {
                key: key.to_string(),
                delta,
            })?;

        let committed = self.put_record(key, &record.with_value(Value::from(updated)))?;
        Ok(committed.then_some(updated))
    }

    /// Subtract `delta` from the integer stored under `key`.
    pub fn decrement(&self, key: &str, delta: i64) -> CacheResult<Option<i64>> {
        let negated = delta.checked_neg().ok_or_else(|| ValueError::Overflow {
            key: key.to_string(),
            delta,
        })?;
        self.increment(key, negated)
    }

    /// Persist a prepared record on every tier, all or nothing.
    pub fn put_record(&self, key: &str, record: &Record) -> CacheResult<bool> {
        Ok(self.cascade_record(key, record)?.is_committed())
    }

    /// Like [`put_record`](Self::put_record), reporting which tier failed and
    /// which tiers were rolled back.
    pub fn cascade_record(&self, key: &str, record: &Record) -> CacheResult<CascadeOutcome> {
        let clock = self.clock.as_ref();
        atomic_cascade(
            self.chain(),
            |store| write_record(store, key, record, clock),
            |store| store.forget(key),
        )
    }

    // === Removal ===

    /// Remove `key` from every tier. Always reports success.
    pub fn forget(&self, key: &str) -> CacheResult<bool> {
        self.sweep(|store| store.forget(key))?;
        Ok(true)
    }

    /// Remove everything from every tier. Always reports success.
    pub fn flush(&self) -> CacheResult<bool> {
        self.sweep(|store| store.flush())?;
        Ok(true)
    }

    /// Run `action` on every tier, reporting which tiers refused it.
    pub fn sweep<A>(&self, action: A) -> CacheResult<SweepOutcome>
    where
        A: Fn(&dyn BackingStore) -> CacheResult<bool>,
    {
        let outcome = best_effort_cascade(self.chain(), action)?;
        if !outcome.is_clean() {
            debug!(failed_tiers = ?outcome.failed_tiers, "sweep finished with failures");
        }
        Ok(outcome)
    }
}

fn ttl_seconds(ttl: Duration) -> TtlSeconds {
    TtlSeconds::try_from(ttl.as_secs()).unwrap_or(TtlSeconds::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;
    use strata_core::{CacheError, Expiry};

    fn memory_stack(n: usize) -> (Vec<Arc<MemoryStore>>, LayeredCacheStore) {
        let stores: Vec<_> = (0..n).map(|_| Arc::new(MemoryStore::default())).collect();
        let tiers = stores.iter().map(|s| Arc::clone(s) as Tier).collect();
        (stores, LayeredCacheStore::new(tiers))
    }

    #[test]
    fn test_empty_stack_is_vacuous() {
        let cache = LayeredCacheStore::new(Vec::new());

        assert_eq!(cache.get("k").unwrap(), None);
        assert!(cache.put("k", json!(1), Some(Duration::from_secs(5))).unwrap());
        assert!(cache.forever("k", json!(1)).unwrap());
        assert!(cache.forget("k").unwrap());
        assert!(cache.flush().unwrap());
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_prefix_is_empty() {
        let (_, cache) = memory_stack(2);
        assert_eq!(cache.prefix(), "");
    }

    #[test]
    fn test_put_without_ttl_is_forever() {
        let (stores, cache) = memory_stack(2);

        assert!(cache.put("k", json!("v"), None).unwrap());
        for store in &stores {
            assert_eq!(store.ttl_of("k").unwrap(), Some(None));
        }
        assert_eq!(cache.record("k").unwrap().map(|r| r.expiry), Some(Expiry::Never));
    }

    #[test]
    fn test_many_preserves_key_association() {
        let (_, cache) = memory_stack(2);
        cache.forever("a", json!(1)).unwrap();
        cache.forever("b", json!("two")).unwrap();

        let values = cache.many(["a", "b", "c"]).unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values["a"], Some(json!(1)));
        assert_eq!(values["b"], Some(json!("two")));
        assert_eq!(values["c"], None);
    }

    #[test]
    fn test_put_many_writes_every_entry() {
        let (stores, cache) = memory_stack(2);

        let ok = cache
            .put_many(
                vec![("a", json!(1)), ("b", json!(2))],
                Some(Duration::from_secs(30)),
            )
            .unwrap();

        assert!(ok);
        for store in &stores {
            assert!(matches!(store.ttl_of("a").unwrap(), Some(Some(ttl)) if ttl <= 30));
            assert!(matches!(store.ttl_of("b").unwrap(), Some(Some(ttl)) if ttl <= 30));
        }
        assert_eq!(cache.get("b").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_increment_and_decrement() {
        let (_, cache) = memory_stack(2);

        assert_eq!(cache.increment("n", 1).unwrap(), Some(1));
        assert_eq!(cache.increment("n", 4).unwrap(), Some(5));
        assert_eq!(cache.decrement("n", 2).unwrap(), Some(3));
        assert_eq!(cache.get("n").unwrap(), Some(json!(3)));
    }

    #[test]
    fn test_decrement_missing_key_starts_negative() {
        let (_, cache) = memory_stack(1);
        assert_eq!(cache.decrement("n", 3).unwrap(), Some(-3));
    }

    #[test]
    fn test_increment_non_numeric_is_error() {
        let (_, cache) = memory_stack(1);
        cache.forever("n", json!("seven")).unwrap();

        let err = cache.increment("n", 1).unwrap_err();
        assert!(matches!(err, CacheError::Value(ValueError::NotNumeric { .. })));
    }

    #[test]
    fn test_increment_overflow_is_error() {
        let (_, cache) = memory_stack(1);
        cache.forever("n", json!(i64::MAX)).unwrap();

        let err = cache.increment("n", 1).unwrap_err();
        assert!(matches!(err, CacheError::Value(ValueError::Overflow { .. })));
        assert_eq!(cache.get("n").unwrap(), Some(json!(i64::MAX)));
    }

    #[test]
    fn test_forget_removes_from_every_tier() {
        let (stores, cache) = memory_stack(3);
        cache.forever("k", json!(1)).unwrap();

        assert!(cache.forget("k").unwrap());
        assert!(stores.iter().all(|s| s.get("k").unwrap().is_none()));
    }

    #[test]
    fn test_debug_reports_tier_count() {
        let (_, cache) = memory_stack(2);
        assert_eq!(format!("{:?}", cache), "LayeredCacheStore { tiers: 2 }");
    }
}
