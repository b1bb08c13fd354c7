//! HERDGUARD Test Utilities
//!
//! Centralized test infrastructure for the HERDGUARD workspace:
//! - Proptest generators for user profiles and collections
//! - Instrumented backing stores that count loads and inject delay or failure
//! - Test fixtures for common scenarios
//! - Tracing setup for tests

// Re-export core types for convenience
pub use herdguard_core::{
    BackingStore, CacheKeys, CacheableRecord, CorruptEntryPolicy, HerdguardConfig,
    HerdguardError, HerdguardResult, JsonCodec, LoadError, LockRetryPolicy, MutexStrategy,
    RecordCollection, UserProfile,
};

use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// TRACING
// ============================================================================

/// Install a test-friendly tracing subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// GENERATORS
// ============================================================================

/// Generate an arbitrary user profile.
pub fn arb_user_profile() -> impl Strategy<Value = UserProfile> {
    (
        any::<i64>(),
        "[A-Za-z][a-z]{0,15}",
        "[A-Za-z][a-z' -]{0,23}",
        "[a-z0-9._]{1,16}@[a-z]{1,12}\\.[a-z]{2,4}",
    )
        .prop_map(|(id, first, last, email)| UserProfile::new(id, first, last, email))
}

/// Generate a collection of up to `max_len` user profiles.
pub fn arb_user_collection(max_len: usize) -> impl Strategy<Value = Vec<UserProfile>> {
    prop::collection::vec(arb_user_profile(), 0..=max_len)
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Three users in id order.
pub fn sample_users() -> Vec<UserProfile> {
    vec![
        UserProfile::new(1, "Ada", "Lovelace", "ada@example.com"),
        UserProfile::new(2, "Alan", "Turing", "alan@example.com"),
        UserProfile::new(3, "Grace", "Hopper", "grace@example.com"),
    ]
}

/// Retry policy with short backoff for tests.
pub fn fast_retry_policy(max_wait: Duration) -> LockRetryPolicy {
    LockRetryPolicy::default()
        .with_backoff(Duration::from_millis(1), Duration::from_millis(20))
        .with_max_attempts(10_000)
        .with_max_wait(max_wait)
}

// ============================================================================
// INSTRUMENTED BACKING STORE
// ============================================================================

/// Backing store that counts `load_all` calls.
///
/// Optionally sleeps before answering (to widen race windows) or fails
/// every load with a fixed reason.
#[derive(Debug)]
pub struct CountingBackingStore<T: CacheableRecord> {
    records: Mutex<Vec<T>>,
    loads: AtomicUsize,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl<T: CacheableRecord> CountingBackingStore<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records: Mutex::new(records),
            loads: AtomicUsize::new(0),
            delay: None,
            failure: None,
        }
    }

    /// Sleep for `delay` inside every load.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every load with `reason`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Number of `load_all` calls so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Replace the records returned by later loads.
    pub fn set_records(&self, records: Vec<T>) {
        *self.records.lock().unwrap_or_else(|err| err.into_inner()) = records;
    }
}

#[async_trait]
impl<T: CacheableRecord> BackingStore<T> for CountingBackingStore<T> {
    async fn load_all(&self) -> Result<RecordCollection<T>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = &self.failure {
            return Err(LoadError::Failed {
                reason: reason.clone(),
            });
        }

        Ok(self
            .records
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_users_are_ordered() {
        let ids: Vec<i64> = sample_users().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    proptest! {
        #[test]
        fn prop_generated_collections_respect_bound(users in arb_user_collection(5)) {
            prop_assert!(users.len() <= 5);
        }
    }
}
