//! Error types for HERDGUARD operations

use std::time::Duration;
use thiserror::Error;

/// Codec errors raised while turning a record collection into its cached
/// text form and back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Decode failed for cache key {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("Encode failed: {reason}")]
    Encode { reason: String },
}

/// Backing store load errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("Backing store load failed: {reason}")]
    Failed { reason: String },

    #[error("Backing store load exceeded deadline of {after:?}")]
    TimedOut { after: Duration },
}

/// Mutex coordination errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("Lock {lock_key} not acquired after {attempts} attempts in {waited:?}")]
    Timeout {
        lock_key: String,
        attempts: u32,
        waited: Duration,
    },

    /// The stored token no longer matched on release. Observed and logged,
    /// never returned from the read path.
    #[error("Lock {lock_key} was no longer owned by token {token} at release")]
    ReleaseMismatch { lock_key: String, token: String },
}

/// Key-value store transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Key-value store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Key-value command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },
}

/// Record lookup errors from the reference user store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("User not found: {id}")]
    UserNotFound { id: i64 },
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

    #[error("Incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },
}

/// Master error type for all HERDGUARD errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HerdguardError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl HerdguardError {
    /// True when the distributed or local mutex could not be obtained in time.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, HerdguardError::Lock(LockError::Timeout { .. }))
    }

    /// True when the backing store load hit its deadline.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, HerdguardError::Load(LoadError::TimedOut { .. }))
    }

    /// True when a cached value could not be decoded.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, HerdguardError::Codec(CodecError::Decode { .. }))
    }
}

/// Result type alias for HERDGUARD operations.
pub type HerdguardResult<T> = Result<T, HerdguardError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_display() {
        let err = LockError::Timeout {
            lock_key: "lock".to_string(),
            attempts: 7,
            waited: Duration::from_millis(250),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("lock"));
        assert!(msg.contains("7 attempts"));
    }

    #[test]
    fn test_codec_error_display_decode() {
        let err = CodecError::Decode {
            key: "allUsers".to_string(),
            reason: "EOF while parsing".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("allUsers"));
        assert!(msg.contains("EOF while parsing"));
    }

    #[test]
    fn test_load_failure_and_deadline_are_distinct() {
        let failed = HerdguardError::from(LoadError::Failed {
            reason: "connection refused".to_string(),
        });
        let timed_out = HerdguardError::from(LoadError::TimedOut {
            after: Duration::from_secs(30),
        });

        assert!(!failed.is_deadline_exceeded());
        assert!(timed_out.is_deadline_exceeded());
        assert!(!failed.is_lock_timeout());
    }

    #[test]
    fn test_herdguard_error_from_variants() {
        let codec = HerdguardError::from(CodecError::Encode {
            reason: "bad float".to_string(),
        });
        assert!(matches!(codec, HerdguardError::Codec(_)));

        let lock = HerdguardError::from(LockError::Timeout {
            lock_key: "lock".to_string(),
            attempts: 1,
            waited: Duration::ZERO,
        });
        assert!(lock.is_lock_timeout());

        let store = HerdguardError::from(StoreError::Unavailable {
            reason: "pool closed".to_string(),
        });
        assert!(matches!(store, HerdguardError::Store(_)));

        let record = HerdguardError::from(RecordError::UserNotFound { id: 42 });
        assert_eq!(format!("{}", record), "Record error: User not found: 42");
    }
}
