//! Error types for STRATA operations

use thiserror::Error;

/// Backing store faults.
///
/// A fault is different from a reported write failure: a tier that cannot
/// store a value answers `Ok(false)`, while a tier that cannot be reached at
/// all answers with one of these. Faults propagate out of the layered cache
/// untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store {store} unavailable: {reason}")]
    Unavailable { store: String, reason: String },

    #[error("Store {store} lock poisoned")]
    LockPoisoned { store: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Errors raised while transforming a cached value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("Value for key {key} is not an integer")]
    NotNumeric { key: String },

    #[error("Adjusting key {key} by {delta} overflows")]
    Overflow { key: String, delta: i64 },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Tier {name} is listed more than once")]
    DuplicateTier { name: String },

    #[error("No store registered under name: {name}")]
    UnknownStore { name: String },
}

/// Master error type for all STRATA errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Value error: {0}")]
    Value(#[from] ValueError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for STRATA operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
