//! HERDGUARD Storage - Cache-Aside Read Path
//!
//! Serves a record collection from a shared key-value store and refills it
//! from the backing store on a miss, with exactly one loader per miss
//! episode. Concurrent loaders are serialized by a process-local mutex or,
//! with several replicas, by a distributed mutex kept in the key-value store
//! itself.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(InMemoryKeyValueStore::new());
//! let users = Arc::new(InMemoryUserStore::new());
//! let local = Arc::new(LocalMutex::new());
//!
//! let cache = CacheAsideOrchestrator::from_config(store, users, local, &config)?;
//! let all_users = cache.get_all().await?;
//! ```

pub mod cache_aside;
pub mod kv;
pub mod mutex;
pub mod stats;
pub mod users;

pub use cache_aside::{CacheAsideOrchestrator, CacheAsideSettings};
pub use kv::{InMemoryKeyValueStore, KeyValueStore};
#[cfg(feature = "redis")]
pub use kv::RedisKeyValueStore;
pub use mutex::{
    DistributedGuard, DistributedMutex, LocalGuard, LocalMutex, RefillGuard, RefillMutex,
};
pub use stats::CacheStats;
pub use users::InMemoryUserStore;
