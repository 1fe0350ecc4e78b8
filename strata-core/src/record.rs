//! Record envelope persisted into every tier.
//!
//! A [`Record`] pairs the caller's value with an [`Expiry`]. Expiry is always
//! absolute once persisted, so a record read from one tier and copied into
//! another gets its remaining lifetime recomputed from the clock instead of
//! inheriting a stale countdown.
//!
//! # Payload Shape
//!
//! ```text
//! { "value": <opaque>, "expiration": <unix seconds> }   // Expiry::At
//! { "value": <opaque> }                                  // Expiry::Never
//! ```

use chrono::{DateTime, TimeDelta};
use serde_json::{Map, Value};

use crate::{Payload, Timestamp, TtlSeconds};

const VALUE_FIELD: &str = "value";
const EXPIRATION_FIELD: &str = "expiration";

/// Expiry state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiry {
    /// Never expires
    Never,
    /// Expires at the given absolute time (second precision)
    At(Timestamp),
}

impl Expiry {
    /// Expiry `ttl_seconds` after `now`.
    ///
    /// Falls back to [`Expiry::Never`] when the deadline is not representable.
    pub fn after(now: Timestamp, ttl_seconds: TtlSeconds) -> Self {
        TimeDelta::try_seconds(ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .and_then(|at| DateTime::from_timestamp(at.timestamp(), 0))
            .map_or(Expiry::Never, Expiry::At)
    }

    /// Seconds left until expiry, or `None` for records that never expire.
    ///
    /// The result is zero or negative once the deadline has passed.
    pub fn remaining(&self, now: Timestamp) -> Option<TtlSeconds> {
        match self {
            Expiry::Never => None,
            Expiry::At(at) => Some(at.timestamp() - now.timestamp()),
        }
    }

    /// Returns true if the record is past its deadline at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.remaining(now), Some(ttl) if ttl <= 0)
    }
}

/// Value plus expiry, as stored in a backing store.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub value: Value,
    pub expiry: Expiry,
}

impl Record {
    /// Create a record that never expires.
    pub fn forever(value: Value) -> Self {
        Self {
            value,
            expiry: Expiry::Never,
        }
    }

    /// Create a record expiring `ttl_seconds` after `now`.
    pub fn expiring_in(value: Value, ttl_seconds: TtlSeconds, now: Timestamp) -> Self {
        Self {
            value,
            expiry: Expiry::after(now, ttl_seconds),
        }
    }

    /// Create a record expiring at an absolute time.
    pub fn expiring_at(value: Value, at: Timestamp) -> Self {
        Self {
            value,
            expiry: Expiry::At(at),
        }
    }

    /// Same expiry, different value.
    pub fn with_value(&self, value: Value) -> Self {
        Self {
            value,
            expiry: self.expiry,
        }
    }

    pub fn remaining_ttl(&self, now: Timestamp) -> Option<TtlSeconds> {
        self.expiry.remaining(now)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiry.is_expired(now)
    }

    /// Encode into the payload handed to a backing store.
    pub fn to_payload(&self) -> Payload {
        let mut map = Map::new();
        map.insert(VALUE_FIELD.to_string(), self.value.clone());
        if let Expiry::At(at) = self.expiry {
            map.insert(EXPIRATION_FIELD.to_string(), Value::from(at.timestamp()));
        }
        Value::Object(map)
    }

    /// Decode a payload read back from a backing store.
    ///
    /// Returns `None` for malformed payloads: anything that is not an object,
    /// lacks a `value` field, or carries a non-integer `expiration`. Callers
    /// treat that the same as a miss.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        let map = payload.as_object()?;
        let value = map.get(VALUE_FIELD)?.clone();

        let expiry = match map.get(EXPIRATION_FIELD) {
            None => Expiry::Never,
            Some(raw) => Expiry::At(DateTime::from_timestamp(raw.as_i64()?, 0)?),
        };

        Some(Self { value, expiry })
    }
}
