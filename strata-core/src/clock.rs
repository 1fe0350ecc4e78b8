//! Wall-clock source used for expiry bookkeeping.

use chrono::Utc;

use crate::Timestamp;

/// Source of the current time.
///
/// Expiry is always persisted as an absolute timestamp; the clock is consulted
/// whenever a remaining TTL has to be derived from it.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}
