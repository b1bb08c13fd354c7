//! In-process refill mutex.
//!
//! One `LocalMutex` is meant to be created per process and shared by every
//! orchestrator through an `Arc`. It keeps one async mutex per logical
//! resource, so refilling one cached collection never waits on another.
//! Nothing here coordinates across processes.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use herdguard_core::{HerdguardResult, LockError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed table of in-process mutexes.
#[derive(Debug, Default)]
pub struct LocalMutex {
    // Slots are never evicted; the resource set is small and fixed.
    slots: DashMap<String, Arc<AsyncMutex<()>>>,
}

/// Proof of holding the local mutex for one resource.
///
/// Dropping the guard releases the mutex, so release happens on every exit
/// path including errors and cancellation.
#[derive(Debug)]
pub struct LocalGuard {
    resource: String,
    _guard: OwnedMutexGuard<()>,
}

impl LocalGuard {
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl LocalMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the mutex for `resource`.
    fn slot(&self, resource: &str) -> Arc<AsyncMutex<()>> {
        // The entry API makes get-or-insert atomic, so racing first
        // acquirers always end up on the same mutex.
        let slot = self
            .slots
            .entry(resource.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())));
        Arc::clone(slot.value())
    }

    /// Wait until the mutex for `resource` is free and take it.
    pub async fn acquire(&self, resource: &str) -> LocalGuard {
        let guard = self.slot(resource).lock_owned().await;
        LocalGuard {
            resource: resource.to_string(),
            _guard: guard,
        }
    }

    /// Like [`LocalMutex::acquire`], giving up after `max_wait`.
    pub async fn acquire_within(
        &self,
        resource: &str,
        max_wait: Duration,
    ) -> HerdguardResult<LocalGuard> {
        match tokio::time::timeout(max_wait, self.acquire(resource)).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(
                    resource = %resource,
                    waited_ms = max_wait.as_millis() as u64,
                    "Local refill mutex not acquired in time"
                );
                Err(LockError::Timeout {
                    lock_key: resource.to_string(),
                    attempts: 1,
                    waited: max_wait,
                }
                .into())
            }
        }
    }

    /// Take the mutex only if it is free right now.
    pub fn try_acquire(&self, resource: &str) -> Option<LocalGuard> {
        self.slot(resource)
            .try_lock_owned()
            .ok()
            .map(|guard| LocalGuard {
                resource: resource.to_string(),
                _guard: guard,
            })
    }
}
