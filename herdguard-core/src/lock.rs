//! Ownership tokens and leases for the distributed mutex.
//!
//! A lease is handed out by a successful acquisition and consumed by
//! release, so a released lease cannot be released twice.
//!
//! ```text
//! (unlocked) ─── acquire() ──→ Lease ─── release(lease) ──→ (unlocked)
//!                                │
//!                           ttl elapses ──→ (unlocked, lease is stale)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Opaque ownership token, unique per acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockToken(String);

impl LockToken {
    /// Generate a fresh token.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LockToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A held distributed lock.
///
/// Deliberately not `Clone`: the only way to give the lock up is to move
/// the lease into a release call.
#[derive(Debug, PartialEq, Eq)]
pub struct DistributedLease {
    lock_key: String,
    token: LockToken,
    ttl: Duration,
}

impl DistributedLease {
    pub fn new(lock_key: impl Into<String>, token: LockToken, ttl: Duration) -> Self {
        Self {
            lock_key: lock_key.into(),
            token,
            ttl,
        }
    }

    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    pub fn token(&self) -> &LockToken {
        &self.token
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Give up the lease, returning the token needed for compare-and-delete.
    pub fn into_token(self) -> LockToken {
        self.token
    }
}
