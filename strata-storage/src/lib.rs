//! STRATA Storage - Layered Cache Combinator
//!
//! Composes an ordered list of independent backing stores into one logical
//! cache. Reads are answered by the first tier holding the key and promote the
//! value into every tier in front of it. Writes cascade through all tiers and
//! roll back the tiers already written when a deeper one refuses.
//!
//! Concrete remote tiers live outside this crate; anything implementing
//! [`BackingStore`] can be stacked. [`MemoryStore`] is provided as the
//! in-process tier.

pub mod cascade;
pub mod chain;
pub mod layered;
pub mod memory;
pub mod normalize;
pub mod registry;
pub mod store;

pub use cascade::{atomic_cascade, best_effort_cascade, CascadeOutcome, SweepOutcome};
pub use chain::{Next, TierChain, TierRef};
pub use layered::LayeredCacheStore;
pub use memory::MemoryStore;
pub use normalize::{read_record, write_record};
pub use registry::StoreRegistry;
pub use store::{BackingStore, Tier};

// Re-export core types used throughout the public API
pub use strata_core::{
    CacheError, CacheResult, Clock, ConfigError, Expiry, MemoryStoreConfig, Payload, Record,
    StackConfig, StoreError, SystemClock, Timestamp, TtlSeconds, ValueError,
};
