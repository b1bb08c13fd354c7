//! Cache and lock key naming.

use serde::{Deserialize, Serialize};

/// Default key holding the cached user collection.
pub const DEFAULT_DATA_KEY: &str = "allUsers";

/// Default key holding the distributed refill lock.
pub const DEFAULT_LOCK_KEY: &str = "lock";

/// The pair of keys one cached resource occupies in the key-value store.
///
/// The data key and the lock key must never coincide, otherwise a lock
/// token could be decoded as cached data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKeys {
    pub data_key: String,
    pub lock_key: String,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self {
            data_key: DEFAULT_DATA_KEY.to_string(),
            lock_key: DEFAULT_LOCK_KEY.to_string(),
        }
    }
}

impl CacheKeys {
    pub fn new(data_key: impl Into<String>, lock_key: impl Into<String>) -> Self {
        Self {
            data_key: data_key.into(),
            lock_key: lock_key.into(),
        }
    }

    /// Keys for a named resource: the resource name is the data key and the
    /// lock lives under `lock:<resource>`.
    pub fn for_resource(resource: &str) -> Self {
        Self {
            data_key: resource.to_string(),
            lock_key: format!("lock:{resource}"),
        }
    }

    pub fn is_distinct(&self) -> bool {
        self.data_key != self.lock_key
    }
}
