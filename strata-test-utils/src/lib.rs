//! STRATA Test Utilities
//!
//! Centralized test infrastructure for the STRATA workspace:
//! - Proptest generators for keys, values and TTLs
//! - A manual clock and a scripted, failure-injecting tier
//! - Test fixtures for common stack shapes
//! - Custom assertions for per-tier state

// Re-export the types tests reach for most often
pub use strata_core::{
    CacheError, CacheResult, Clock, ConfigError, Expiry, MemoryStoreConfig, Payload, Record,
    StackConfig, StoreError, Timestamp, TtlSeconds, ValueError,
};
pub use strata_storage::{BackingStore, LayeredCacheStore, MemoryStore, Tier};

use chrono::{DateTime, TimeDelta};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Fixed starting point for frozen clocks: 2024-01-01T00:00:00Z.
pub const EPOCH_SECS: i64 = 1_704_067_200;

/// Install a fmt subscriber for test output, once per process.
///
/// Honors `RUST_LOG`; defaults to `strata_storage=debug`.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("strata_storage=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// MANUAL CLOCK
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn at(now: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    /// Clock frozen at [`EPOCH_SECS`].
    pub fn frozen() -> Arc<Self> {
        Self::at(timestamp(EPOCH_SECS))
    }

    pub fn advance(&self, by: Duration) {
        let step = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = lock(&self.now);
        *now = now.checked_add_signed(step).unwrap_or(*now);
    }

    pub fn set(&self, to: Timestamp) {
        *lock(&self.now) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *lock(&self.now)
    }
}

/// Timestamp at whole `secs` since the Unix epoch.
pub fn timestamp(secs: i64) -> Timestamp {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

// ============================================================================
// SCRIPTED STORE
// ============================================================================

/// One call observed by a [`ScriptedStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Get(String),
    Put { key: String, ttl_seconds: TtlSeconds },
    Forever(String),
    Forget(String),
    Flush,
}

impl StoreOp {
    pub fn key(&self) -> Option<&str> {
        match self {
            StoreOp::Get(key) | StoreOp::Forever(key) | StoreOp::Forget(key) => Some(key),
            StoreOp::Put { key, .. } => Some(key),
            StoreOp::Flush => None,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, StoreOp::Put { .. } | StoreOp::Forever(_))
    }
}

/// Tier that journals every call and can be told to refuse or fault.
///
/// Storage and expiry are delegated to a [`MemoryStore`] sharing the test's
/// clock. Seeding and peeking bypass the journal.
pub struct ScriptedStore {
    name: String,
    clock: Arc<dyn Clock>,
    inner: MemoryStore,
    journal: Mutex<Vec<StoreOp>>,
    refuse_writes: AtomicBool,
    refuse_forget: AtomicBool,
    refuse_flush: AtomicBool,
    fault_on_get: AtomicBool,
}

impl ScriptedStore {
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Arc<Self> {
        let inner = MemoryStore::with_clock(MemoryStoreConfig::default(), Arc::clone(&clock))
            .unwrap_or_default();
        Arc::new(Self {
            name: name.into(),
            clock,
            inner,
            journal: Mutex::new(Vec::new()),
            refuse_writes: AtomicBool::new(false),
            refuse_forget: AtomicBool::new(false),
            refuse_flush: AtomicBool::new(false),
            fault_on_get: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make `put`/`forever` report `false`.
    pub fn refuse_writes(&self, on: bool) {
        self.refuse_writes.store(on, Ordering::SeqCst);
    }

    /// Make `forget` report `false` (the key is still removed).
    pub fn refuse_forget(&self, on: bool) {
        self.refuse_forget.store(on, Ordering::SeqCst);
    }

    /// Make `flush` report `false` (the tier is still cleared).
    pub fn refuse_flush(&self, on: bool) {
        self.refuse_flush.store(on, Ordering::SeqCst);
    }

    /// Make `get` fail with `StoreError::Unavailable`.
    pub fn fault_on_get(&self, on: bool) {
        self.fault_on_get.store(on, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        lock(&self.journal).clone()
    }

    pub fn clear_ops(&self) {
        lock(&self.journal).clear();
    }

    /// Operations that mention `key`.
    pub fn ops_for(&self, key: &str) -> Vec<StoreOp> {
        lock(&self.journal)
            .iter()
            .filter(|op| op.key() == Some(key))
            .cloned()
            .collect()
    }

    pub fn writes_for(&self, key: &str) -> usize {
        self.ops_for(key).iter().filter(|op| op.is_write()).count()
    }

    /// Store `record` directly, as if an earlier process had written it.
    pub fn seed(&self, key: &str, record: &Record) {
        let now = self.clock.now();
        let _ = match record.remaining_ttl(now) {
            None => self.inner.forever(key, record.to_payload()),
            Some(ttl) => self.inner.put(key, record.to_payload(), ttl),
        };
    }

    /// Store a raw payload directly, bypassing the record envelope.
    pub fn seed_payload(&self, key: &str, payload: Payload) {
        let _ = self.inner.forever(key, payload);
    }

    /// Raw payload currently held for `key`.
    pub fn payload(&self, key: &str) -> Option<Payload> {
        self.inner.get(key).ok().flatten()
    }

    /// Decoded record currently held for `key`.
    pub fn peek(&self, key: &str) -> Option<Record> {
        self.payload(key).as_ref().and_then(Record::from_payload)
    }

    /// TTL bookkeeping as seen by this tier's own expiry.
    pub fn ttl_of(&self, key: &str) -> Option<Option<TtlSeconds>> {
        self.inner.ttl_of(key).ok().flatten()
    }

    pub fn holds(&self, key: &str) -> bool {
        self.payload(key).is_some()
    }

    fn record_op(&self, op: StoreOp) {
        lock(&self.journal).push(op);
    }
}

impl BackingStore for ScriptedStore {
    fn get(&self, key: &str) -> CacheResult<Option<Payload>> {
        self.record_op(StoreOp::Get(key.to_string()));
        if self.fault_on_get.load(Ordering::SeqCst) {
            return Err(CacheError::Store(StoreError::Unavailable {
                store: self.name.clone(),
                reason: "injected fault".to_string(),
            }));
        }
        self.inner.get(key)
    }

    fn put(&self, key: &str, payload: Payload, ttl_seconds: TtlSeconds) -> CacheResult<bool> {
        self.record_op(StoreOp::Put {
            key: key.to_string(),
            ttl_seconds,
        });
        if self.refuse_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.put(key, payload, ttl_seconds)
    }

    fn forever(&self, key: &str, payload: Payload) -> CacheResult<bool> {
        self.record_op(StoreOp::Forever(key.to_string()));
        if self.refuse_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.forever(key, payload)
    }

    fn forget(&self, key: &str) -> CacheResult<bool> {
        self.record_op(StoreOp::Forget(key.to_string()));
        self.inner.forget(key)?;
        Ok(!self.refuse_forget.load(Ordering::SeqCst))
    }

    fn flush(&self) -> CacheResult<bool> {
        self.record_op(StoreOp::Flush);
        self.inner.flush()?;
        Ok(!self.refuse_flush.load(Ordering::SeqCst))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for cache keys, values and lifetimes.

    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    /// Generate a cache key.
    pub fn arb_key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9:_]{0,15}"
    }

    /// Generate an opaque JSON value (no floats, shallow nesting).
    pub fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,24}".prop_map(Value::from),
        ];
        leaf.prop_recursive(2, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    /// Generate a TTL in whole seconds (1 second to 1 day).
    pub fn arb_ttl() -> impl Strategy<Value = Duration> {
        (1u64..=86_400).prop_map(Duration::from_secs)
    }

    /// Generate a realistic tier count.
    pub fn arb_tier_count() -> impl Strategy<Value = usize> {
        1usize..=5
    }

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_577_836_800i64..1_893_456_000i64).prop_map(timestamp)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built stacks for common testing scenarios.

    use super::*;

    /// A layered cache over scripted tiers sharing one manual clock.
    pub struct ScriptedStack {
        pub clock: Arc<ManualClock>,
        pub tiers: Vec<Arc<ScriptedStore>>,
        pub cache: LayeredCacheStore,
    }

    impl ScriptedStack {
        pub fn tier(&self, index: usize) -> &ScriptedStore {
            &self.tiers[index]
        }

        pub fn clear_ops(&self) {
            self.tiers.iter().for_each(|tier| tier.clear_ops());
        }
    }

    /// Build `n` scripted tiers named `tier0..tierN` behind one cache.
    pub fn scripted_stack(n: usize) -> ScriptedStack {
        let clock = ManualClock::frozen();
        let tiers: Vec<_> = (0..n)
            .map(|i| ScriptedStore::new(format!("tier{}", i), clock.clone()))
            .collect();
        let cache = LayeredCacheStore::with_clock(
            tiers.iter().map(|t| Arc::clone(t) as Tier).collect(),
            clock.clone(),
        );
        ScriptedStack {
            clock,
            tiers,
            cache,
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over per-tier state.

    use super::*;
    use serde_json::Value;

    /// Assert that `store` holds a record for `key` with the given value.
    #[track_caller]
    pub fn assert_tier_holds(store: &ScriptedStore, key: &str, expected: &Value) {
        match store.peek(key) {
            Some(record) => assert_eq!(
                &record.value,
                expected,
                "{} holds the wrong value for {}",
                store.name(),
                key
            ),
            None => panic!("{} does not hold {}", store.name(), key),
        }
    }

    /// Assert that `store` holds nothing for `key`.
    #[track_caller]
    pub fn assert_tier_lacks(store: &ScriptedStore, key: &str) {
        assert!(
            store.payload(key).is_none(),
            "{} unexpectedly holds {}: {:?}",
            store.name(),
            key,
            store.payload(key)
        );
    }

    /// Assert that `store` received no call at all.
    #[track_caller]
    pub fn assert_untouched(store: &ScriptedStore) {
        assert!(
            store.ops().is_empty(),
            "{} was called: {:?}",
            store.name(),
            store.ops()
        );
    }

    /// Assert that `store` received no write for `key`.
    #[track_caller]
    pub fn assert_no_writes(store: &ScriptedStore, key: &str) {
        assert_eq!(
            store.writes_for(key),
            0,
            "{} was written for {}: {:?}",
            store.name(),
            key,
            store.ops_for(key)
        );
    }

    /// Assert that a CacheResult is a Store error.
    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::Store(_)) => {}
            other => panic!("Expected Store error, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
