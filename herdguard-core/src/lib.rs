//! HERDGUARD Core - Records, Codec, Errors and Configuration
//!
//! Types shared by every HERDGUARD crate. Nothing in here talks to a
//! key-value store; the storage crate builds the cache-aside read path on
//! top of these definitions.

pub mod backing;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod lock;
pub mod record;
pub mod retry;

pub use backing::BackingStore;
pub use codec::JsonCodec;
pub use config::{
    CorruptEntryPolicy, HerdguardConfig, MutexStrategy, DEFAULT_CACHE_TTL, DEFAULT_LOAD_TIMEOUT,
    DEFAULT_LOCK_TTL,
};
pub use error::{
    CodecError, ConfigError, HerdguardError, HerdguardResult, LoadError, LockError, RecordError,
    StoreError,
};
pub use keys::{CacheKeys, DEFAULT_DATA_KEY, DEFAULT_LOCK_KEY};
pub use lock::{DistributedLease, LockToken};
pub use record::{CacheableRecord, RecordCollection, UserProfile};
pub use retry::LockRetryPolicy;
