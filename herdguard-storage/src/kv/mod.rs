//! Key-value store abstraction.
//!
//! The cache-aside read path needs only a textual key-value service with
//! per-key TTL and two atomic primitives: create-if-absent and
//! compare-and-delete. Every correctness argument about the refill mutex
//! rests on those two being indivisible on the store side.

use std::time::Duration;

use async_trait::async_trait;
use herdguard_core::HerdguardResult;

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryKeyValueStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisKeyValueStore;

/// Key-value store trait for pluggable backends.
///
/// All operations touch shared, externally visible state. Implementations
/// must be thread-safe and must implement `set_if_absent` and
/// `compare_and_delete` as single server-side operations, never as a
/// client-side read followed by a write.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read a value. Absence is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> HerdguardResult<Option<String>>;

    /// Unconditionally overwrite `key`. `ttl == None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HerdguardResult<()>;

    /// Create `key` only if it does not exist.
    ///
    /// Returns true iff this call created the entry.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> HerdguardResult<bool>;

    /// Delete `key` only if its current value equals `expected`.
    ///
    /// Returns true iff this call removed the entry.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> HerdguardResult<bool>;

    /// Unconditionally delete `key`. Returns true if an entry was removed.
    async fn delete(&self, key: &str) -> HerdguardResult<bool>;
}

