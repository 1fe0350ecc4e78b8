//! Record reads and writes against a single tier.
//!
//! Every record handed to a tier is re-derived from its absolute expiry at the
//! moment of the write, so promotion into a tier with a different clock or
//! precision never double-counts elapsed time.

use strata_core::{CacheResult, Clock, Expiry, Record};
use tracing::{debug, trace};

use crate::store::BackingStore;

/// Persist `record` into `store`.
///
/// `Expiry::Never` goes through `forever`. `Expiry::At` goes through `put`
/// with the seconds remaining at `clock.now()`; a zero or negative remainder
/// is passed through and the tier decides what it means.
pub fn write_record(
    store: &dyn BackingStore,
    key: &str,
    record: &Record,
    clock: &dyn Clock,
) -> CacheResult<bool> {
    match record.expiry {
        Expiry::Never => store.forever(key, record.to_payload()),
        Expiry::At(at) => {
            let remaining = at.timestamp() - clock.now().timestamp();
            if remaining <= 0 {
                trace!(key, remaining, "writing record at or past its expiry");
            }
            store.put(key, record.to_payload(), remaining)
        }
    }
}

/// Read and decode the record stored under `key`.
///
/// A payload that does not decode into a record counts as a miss.
pub fn read_record(store: &dyn BackingStore, key: &str) -> CacheResult<Option<Record>> {
    let Some(payload) = store.get(key)? else {
        return Ok(None);
    };

    match Record::from_payload(&payload) {
        Some(record) => Ok(Some(record)),
        None => {
            debug!(key, "discarding malformed record");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::DateTime;
    use serde_json::json;
    use std::sync::Arc;
    use strata_core::{MemoryStoreConfig, Timestamp};

    struct FixedClock(Timestamp);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            self.0
        }
    }

    fn at(secs: i64) -> Timestamp {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    fn store_at(secs: i64) -> MemoryStore {
        MemoryStore::with_clock(MemoryStoreConfig::default(), Arc::new(FixedClock(at(secs))))
            .expect("valid config")
    }

    #[test]
    fn test_forever_record_has_no_ttl() {
        let clock = FixedClock(at(1_000));
        let store = store_at(1_000);
        let record = Record::forever(json!("v"));

        assert!(write_record(&store, "k", &record, &clock).unwrap());
        assert_eq!(store.ttl_of("k").unwrap(), Some(None));
        assert_eq!(read_record(&store, "k").unwrap(), Some(record));
    }

    #[test]
    fn test_expiring_record_gets_remaining_ttl() {
        let clock = FixedClock(at(1_004));
        let store = store_at(1_004);
        let record = Record::expiring_at(json!(42), at(1_010));

        assert!(write_record(&store, "k", &record, &clock).unwrap());
        assert_eq!(store.ttl_of("k").unwrap(), Some(Some(6)));
        assert_eq!(read_record(&store, "k").unwrap(), Some(record));
    }

    #[test]
    fn test_malformed_payload_reads_as_miss() {
        let store = MemoryStore::default();
        store.forever("k", json!({ "expiration": 5 })).unwrap();
        assert_eq!(read_record(&store, "k").unwrap(), None);
    }

    #[test]
    fn test_expired_record_passes_non_positive_ttl_through() {
        let clock = FixedClock(at(2_000));
        let store = store_at(2_000);
        store.forever("k", json!({ "value": "old" })).unwrap();

        let record = Record::expiring_at(json!("late"), at(1_990));
        assert!(write_record(&store, "k", &record, &clock).unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }
}
