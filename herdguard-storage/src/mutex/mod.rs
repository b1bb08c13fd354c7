//! Refill mutexes.
//!
//! A cache refill is serialized either within one process ([`LocalMutex`])
//! or across every replica sharing the key-value store
//! ([`DistributedMutex`]). [`RefillMutex`] selects between the two so the
//! orchestrator has a single code path.

pub mod distributed;
pub mod local;

use std::sync::Arc;
use std::time::Duration;

use herdguard_core::{HerdguardResult, MutexStrategy};

pub use distributed::{DistributedGuard, DistributedMutex};
pub use local::{LocalGuard, LocalMutex};

use crate::kv::KeyValueStore;

/// The mutual-exclusion scope guarding one cached resource.
pub enum RefillMutex<K: KeyValueStore> {
    /// Shared in-process table plus the resource name to lock in it.
    Local {
        mutex: Arc<LocalMutex>,
        resource: String,
        max_wait: Duration,
    },
    Distributed(DistributedMutex<K>),
}

/// A held refill mutex of either scope.
///
/// Both variants release when dropped, so a cancelled refill never keeps
/// the mutex.
pub enum RefillGuard<K: KeyValueStore> {
    Local(LocalGuard),
    Distributed(DistributedGuard<K>),
}

impl<K: KeyValueStore> RefillMutex<K> {
    pub fn strategy(&self) -> MutexStrategy {
        match self {
            RefillMutex::Local { .. } => MutexStrategy::Local,
            RefillMutex::Distributed(_) => MutexStrategy::Distributed,
        }
    }

    /// Acquire within the configured budget, failing with a lock timeout.
    pub async fn acquire(&self) -> HerdguardResult<RefillGuard<K>> {
        match self {
            RefillMutex::Local {
                mutex,
                resource,
                max_wait,
            } => Ok(RefillGuard::Local(
                mutex.acquire_within(resource, *max_wait).await?,
            )),
            RefillMutex::Distributed(mutex) => {
                let lease = mutex.acquire().await?;
                Ok(RefillGuard::Distributed(DistributedGuard::new(
                    mutex.clone(),
                    lease,
                )))
            }
        }
    }

    /// Release a guard obtained from this mutex.
    ///
    /// Returns false only for a distributed lease that had already lapsed.
    pub async fn release(&self, guard: RefillGuard<K>) -> HerdguardResult<bool> {
        match guard {
            RefillGuard::Local(guard) => {
                drop(guard);
                Ok(true)
            }
            RefillGuard::Distributed(guard) => guard.release().await,
        }
    }
}
