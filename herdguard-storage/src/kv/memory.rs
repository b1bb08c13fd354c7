//! In-memory key-value store with TTL support.
//!
//! Every operation runs under one mutex, which makes `set_if_absent` and
//! `compare_and_delete` trivially atomic. Expiry uses `tokio::time::Instant`
//! so tests can pause and advance the clock instead of sleeping.
//!
//! Several orchestrators sharing one `Arc<InMemoryKeyValueStore>` behave like
//! replicas sharing one remote store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use herdguard_core::HerdguardResult;
use tokio::time::Instant;

use super::KeyValueStore;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Process-local key-value store.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, StoredValue>) -> R) -> R {
        let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        let now = Instant::now();
        entries.retain(|_, stored| stored.is_live(now));
        f(&mut entries)
    }

    /// Remaining TTL of a live key; `None` if absent or without expiry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.with_entries(|entries| {
            entries
                .get(key)
                .and_then(|stored| stored.expires_at)
                .map(|at| at.saturating_duration_since(Instant::now()))
        })
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> HerdguardResult<Option<String>> {
        Ok(self.with_entries(|entries| entries.get(key).map(|stored| stored.value.clone())))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HerdguardResult<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), StoredValue::new(value, ttl));
        });
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> HerdguardResult<bool> {
        Ok(self.with_entries(|entries| {
            if entries.contains_key(key) {
                false
            } else {
                entries.insert(key.to_string(), StoredValue::new(value, Some(ttl)));
                true
            }
        }))
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> HerdguardResult<bool> {
        Ok(self.with_entries(|entries| match entries.get(key) {
            Some(stored) if stored.value == expected => {
                entries.remove(key);
                true
            }
            _ => false,
        }))
    }

    async fn delete(&self, key: &str) -> HerdguardResult<bool> {
        Ok(self.with_entries(|entries| entries.remove(key).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = InMemoryKeyValueStore::new();
        store.set("k", "one", None).await.unwrap();
        store.set("k", "two", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
        assert_eq!(store.ttl_remaining("k"), None);
    }

    #[tokio::test]
    async fn test_set_if_absent_only_creates_once() {
        let store = InMemoryKeyValueStore::new();
        let ttl = Duration::from_secs(30);
        assert!(store.set_if_absent("lock", "a", ttl).await.unwrap());
        assert!(!store.set_if_absent("lock", "b", ttl).await.unwrap());
        assert_eq!(store.get("lock").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_compare_and_delete_checks_value() {
        let store = InMemoryKeyValueStore::new();
        store.set("lock", "a", None).await.unwrap();
        assert!(!store.compare_and_delete("lock", "b").await.unwrap());
        assert_eq!(store.get("lock").await.unwrap().as_deref(), Some("a"));
        assert!(store.compare_and_delete("lock", "a").await.unwrap());
        assert_eq!(store.get("lock").await.unwrap(), None);
        assert!(!store.compare_and_delete("lock", "a").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = InMemoryKeyValueStore::new();
        store
            .set("k", "v", Some(Duration::from_secs(10)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("k").await.unwrap().is_some());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.unwrap().is_none());

        // An expired lock no longer blocks creation.
        assert!(store
            .set_if_absent("lock", "a", Duration::from_secs(1))
            .await
            .unwrap());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store
            .set_if_absent("lock", "b", Duration::from_secs(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryKeyValueStore::new();
        store.set("k", "v", None).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.is_empty());
    }
}
