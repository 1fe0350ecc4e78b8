//! STRATA Core - Record and Error Types
//!
//! Pure data structures shared by every STRATA crate. The layered cache logic
//! lives in `strata-storage`; this crate only defines what gets persisted into
//! a tier and how failures are described.

use chrono::{DateTime, Utc};

pub mod clock;
pub mod config;
pub mod error;
pub mod record;

pub use clock::{Clock, SystemClock};
pub use config::{MemoryStoreConfig, StackConfig};
pub use error::{CacheError, CacheResult, ConfigError, StoreError, ValueError};
pub use record::{Expiry, Record};

// ============================================================================
// SHARED TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Time-to-live in whole seconds, as handed to a backing store.
///
/// Signed on purpose: a record promoted right at its expiry boundary yields a
/// zero or negative remaining lifetime, and that value is passed through to
/// the tier untouched.
pub type TtlSeconds = i64;

/// Opaque payload type stored in a backing store.
pub type Payload = serde_json::Value;
