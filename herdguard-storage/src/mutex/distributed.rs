//! Distributed refill mutex on top of a shared key-value store.
//!
//! Acquire is `set_if_absent(lock_key, fresh_token, ttl)`; release is
//! `compare_and_delete(lock_key, token)`. The TTL bounds how long a crashed
//! holder can block everyone else. Because the TTL can also lapse under a
//! slow but live holder, release only deletes the entry when it still holds
//! the caller's own token.
//!
//! [`DistributedGuard`] ties a lease to its mutex so that a guard dropped
//! without an explicit release (a cancelled caller, usually) still gets its
//! compare-and-delete, on a spawned task.

use std::sync::Arc;
use std::time::Duration;

use herdguard_core::{DistributedLease, HerdguardResult, LockError, LockRetryPolicy, LockToken};
use tokio::time::Instant;

use crate::kv::KeyValueStore;

/// Cross-replica mutex for one lock key.
pub struct DistributedMutex<K: KeyValueStore> {
    store: Arc<K>,
    lock_key: String,
    ttl: Duration,
    retry: LockRetryPolicy,
}

impl<K: KeyValueStore> DistributedMutex<K> {
    pub fn new(
        store: Arc<K>,
        lock_key: impl Into<String>,
        ttl: Duration,
        retry: LockRetryPolicy,
    ) -> Self {
        Self {
            store,
            lock_key: lock_key.into(),
            ttl,
            retry,
        }
    }

    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn retry_policy(&self) -> &LockRetryPolicy {
        &self.retry
    }

    /// Single acquisition attempt with a freshly generated token.
    ///
    /// `Ok(None)` means another party holds the lock.
    pub async fn try_acquire(&self) -> HerdguardResult<Option<DistributedLease>> {
        let token = LockToken::generate();
        let created = self
            .store
            .set_if_absent(&self.lock_key, token.as_str(), self.ttl)
            .await?;
        Ok(created.then(|| DistributedLease::new(self.lock_key.clone(), token, self.ttl)))
    }

    /// Acquire with bounded, jittered exponential backoff.
    ///
    /// Fails with [`LockError::Timeout`] once either the attempt budget or
    /// the wall-clock budget of the retry policy is spent.
    pub async fn acquire(&self) -> HerdguardResult<DistributedLease> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if let Some(lease) = self.try_acquire().await? {
                if attempts > 1 {
                    tracing::debug!(
                        lock_key = %self.lock_key,
                        attempts,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Distributed lock acquired after contention"
                    );
                }
                return Ok(lease);
            }

            let waited = started.elapsed();
            if attempts >= self.retry.max_attempts || waited >= self.retry.max_wait {
                tracing::warn!(
                    lock_key = %self.lock_key,
                    attempts,
                    waited_ms = waited.as_millis() as u64,
                    "Distributed lock retry budget exhausted"
                );
                return Err(LockError::Timeout {
                    lock_key: self.lock_key.clone(),
                    attempts,
                    waited,
                }
                .into());
            }

            let delay = self
                .retry
                .delay_for_attempt(attempts - 1)
                .min(self.retry.max_wait - waited);
            tracing::trace!(
                lock_key = %self.lock_key,
                attempts,
                delay_ms = delay.as_millis() as u64,
                "Distributed lock busy, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Release a lease.
    ///
    /// Returns false when the stored token no longer matches, meaning the
    /// lease expired and possibly went to another holder. That case is
    /// logged as a release mismatch and otherwise left alone.
    pub async fn release(&self, lease: DistributedLease) -> HerdguardResult<bool> {
        let lock_key = lease.lock_key().to_string();
        let token = lease.into_token();
        let removed = self
            .store
            .compare_and_delete(&lock_key, token.as_str())
            .await?;

        if !removed {
            let mismatch = LockError::ReleaseMismatch {
                lock_key,
                token: token.to_string(),
            };
            tracing::warn!(error = %mismatch, "Distributed lock released after losing ownership");
        }

        Ok(removed)
    }
}

/// A lease bound to the mutex that issued it.
///
/// Release explicitly with [`DistributedGuard::release`]. A guard dropped
/// while still holding its lease spawns the compare-and-delete instead.
pub struct DistributedGuard<K: KeyValueStore> {
    mutex: DistributedMutex<K>,
    lease: Option<DistributedLease>,
    acquired_at: Instant,
}

impl<K: KeyValueStore> DistributedGuard<K> {
    pub fn new(mutex: DistributedMutex<K>, lease: DistributedLease) -> Self {
        Self {
            mutex,
            lease: Some(lease),
            acquired_at: Instant::now(),
        }
    }

    pub fn lock_key(&self) -> &str {
        self.mutex.lock_key()
    }

    /// Time since the lease was granted.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Whether the lock TTL has run out, so the store may already have
    /// handed the lock to someone else.
    pub fn is_lapsed(&self) -> bool {
        self.held_for() >= self.mutex.ttl
    }

    /// Release now; see [`DistributedMutex::release`].
    pub async fn release(mut self) -> HerdguardResult<bool> {
        match self.lease.take() {
            Some(lease) => {
                if self.is_lapsed() {
                    tracing::warn!(
                        lock_key = %self.mutex.lock_key,
                        held_ms = self.held_for().as_millis() as u64,
                        ttl_ms = self.mutex.ttl.as_millis() as u64,
                        "Distributed lock held past its TTL"
                    );
                }
                self.mutex.release(lease).await
            }
            None => Ok(false),
        }
    }
}

impl<K: KeyValueStore> Drop for DistributedGuard<K> {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        let lock_key = lease.lock_key().to_string();
        let token = lease.into_token();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                lock_key = %lock_key,
                "Distributed guard dropped outside a runtime, relying on lock TTL"
            );
            return;
        };

        tracing::debug!(lock_key = %lock_key, "Distributed guard dropped, releasing in background");
        let store = Arc::clone(&self.mutex.store);
        runtime.spawn(async move {
            match store.compare_and_delete(&lock_key, token.as_str()).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!(
                    lock_key = %lock_key,
                    token = %token,
                    "Dropped distributed guard had already lost ownership"
                ),
                Err(err) => tracing::warn!(
                    lock_key = %lock_key,
                    error = %err,
                    "Background release failed, relying on lock TTL"
                ),
            }
        });
    }
}

impl<K: KeyValueStore> Clone for DistributedMutex<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lock_key: self.lock_key.clone(),
            ttl: self.ttl,
            retry: self.retry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKeyValueStore;

    fn mutex(store: Arc<InMemoryKeyValueStore>, ttl: Duration) -> DistributedMutex<InMemoryKeyValueStore> {
        DistributedMutex::new(
            store,
            "lock",
            ttl,
            LockRetryPolicy::default()
                .with_backoff(Duration::from_millis(5), Duration::from_millis(50))
                .with_max_wait(Duration::from_millis(500)),
        )
    }

    #[tokio::test]
    async fn test_try_acquire_stores_token() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mutex = mutex(Arc::clone(&store), Duration::from_secs(300));

        let lease = mutex.try_acquire().await.unwrap().expect("free lock");
        assert_eq!(
            store.get("lock").await.unwrap().as_deref(),
            Some(lease.token().as_str())
        );
        assert!(mutex.try_acquire().await.unwrap().is_none());

        assert!(mutex.release(lease).await.unwrap());
        assert_eq!(store.get("lock").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lock_entry_carries_ttl() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mutex = mutex(Arc::clone(&store), Duration::from_secs(300));
        let _lease = mutex.try_acquire().await.unwrap().expect("free lock");

        let remaining = store.ttl_remaining("lock").expect("lock has ttl");
        assert!(remaining <= Duration::from_secs(300));
        assert!(remaining > Duration::from_secs(290));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_release() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let holder = mutex(Arc::clone(&store), Duration::from_secs(300));
        let waiter = holder.clone();

        let lease = holder.try_acquire().await.unwrap().expect("free lock");
        let handle = tokio::spawn(async move { waiter.acquire().await });

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(holder.release(lease).await.unwrap());

        let second = handle.await.unwrap().expect("acquired after release");
        assert_eq!(second.lock_key(), "lock");
    }

    #[tokio::test]
    async fn test_dropped_guard_releases_in_background() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mutex = mutex(Arc::clone(&store), Duration::from_secs(300));

        let lease = mutex.try_acquire().await.unwrap().expect("free lock");
        drop(DistributedGuard::new(mutex.clone(), lease));
        tokio::task::yield_now().await;

        assert_eq!(store.get("lock").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_released_guard_does_not_release_again() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mutex = mutex(Arc::clone(&store), Duration::from_secs(300));

        let lease = mutex.try_acquire().await.unwrap().expect("free lock");
        let guard = DistributedGuard::new(mutex.clone(), lease);
        assert!(guard.release().await.unwrap());

        // Someone else takes the lock; the consumed guard must not touch it.
        let other = mutex.try_acquire().await.unwrap().expect("free lock");
        tokio::task::yield_now().await;
        assert_eq!(
            store.get("lock").await.unwrap().as_deref(),
            Some(other.token().as_str())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_reports_lapse_on_store_clock() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mutex = mutex(Arc::clone(&store), Duration::from_secs(10));

        let lease = mutex.try_acquire().await.unwrap().expect("free lock");
        let guard = DistributedGuard::new(mutex.clone(), lease);
        assert!(!guard.is_lapsed());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(guard.is_lapsed());
        assert_eq!(store.get("lock").await.unwrap(), None);
        assert!(!guard.release().await.unwrap());
    }
}
