//! Backing store contract consumed by the layered cache.
//!
//! A backing store is one tier: an in-process table, a remote key-value
//! service, a file-backed store. The layered cache treats every tier through
//! this trait alone and never shares identity across tiers beyond the key.

use std::sync::Arc;

use strata_core::{CacheResult, Payload, TtlSeconds};

/// Uniform key-value capability of a single tier.
///
/// # Contract
///
/// - Mutating calls report `Ok(false)` when the tier declined the write
///   (capacity, size limits, transient refusal). The layered cache aborts and
///   rolls back on that signal.
/// - `Err(_)` is a fault (connectivity, poisoned state). The layered cache
///   propagates faults without retrying.
/// - Each tier enforces its own expiry. `put` may receive a zero or negative
///   `ttl_seconds`; how that is honored is the tier's own decision.
/// - Implementations must make single-key operations safe under concurrent
///   access. No cross-tier coordination is provided.
pub trait BackingStore: Send + Sync {
    /// Fetch the payload stored under `key`, if any.
    fn get(&self, key: &str) -> CacheResult<Option<Payload>>;

    /// Store a payload that expires after `ttl_seconds`.
    fn put(&self, key: &str, payload: Payload, ttl_seconds: TtlSeconds) -> CacheResult<bool>;

    /// Store a payload with no expiration.
    fn forever(&self, key: &str, payload: Payload) -> CacheResult<bool>;

    /// Remove the payload stored under `key`.
    fn forget(&self, key: &str) -> CacheResult<bool>;

    /// Remove every payload held by this tier.
    fn flush(&self) -> CacheResult<bool>;
}

/// A tier as held by the layered cache.
pub type Tier = Arc<dyn BackingStore>;
