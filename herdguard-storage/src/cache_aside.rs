//! Cache-aside read path with single-loader refill.
//!
//! Every `get_all` call walks the same states:
//!
//! ```text
//! CheckCache ──hit──→ Returned
//!     │ miss
//!     ▼
//! AcquireMutex ──budget spent──→ LockTimeout
//!     │
//!     ▼
//! RecheckCache ──hit──→ Release → Returned
//!     │ miss
//!     ▼
//! Load ──error / deadline──→ Release → LoadFailure
//!     │
//!     ▼
//! Populate → Release → Returned
//! ```
//!
//! The re-check under the mutex is what turns N concurrent misses into one
//! backing-store load: every caller after the first finds the entry the
//! first one wrote.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use herdguard_core::{
    BackingStore, CacheKeys, CacheableRecord, CorruptEntryPolicy, HerdguardConfig,
    HerdguardResult, JsonCodec, LoadError, MutexStrategy, RecordCollection,
};

use crate::kv::KeyValueStore;
use crate::mutex::{DistributedMutex, LocalMutex, RefillMutex};
use crate::stats::{CacheStats, StatsRecorder};

/// Settings of one orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheAsideSettings {
    pub keys: CacheKeys,
    /// TTL applied on every repopulation
    pub cache_ttl: Duration,
    /// Deadline for one backing-store load
    pub load_timeout: Duration,
    pub corrupt_entry_policy: CorruptEntryPolicy,
}

impl Default for CacheAsideSettings {
    fn default() -> Self {
        Self::from(&HerdguardConfig::default())
    }
}

impl From<&HerdguardConfig> for CacheAsideSettings {
    fn from(config: &HerdguardConfig) -> Self {
        Self {
            keys: config.keys.clone(),
            cache_ttl: config.cache_ttl,
            load_timeout: config.load_timeout,
            corrupt_entry_policy: config.corrupt_entry_policy,
        }
    }
}

impl CacheAsideSettings {
    /// Set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the load deadline.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Set the corrupt entry policy.
    pub fn with_corrupt_entry_policy(mut self, policy: CorruptEntryPolicy) -> Self {
        self.corrupt_entry_policy = policy;
        self
    }
}

/// Cache-aside orchestrator for one cached record collection.
///
/// # Type Parameters
///
/// - `T`: the cached record type
/// - `K`: the key-value store holding the cache entry (and the lock, in
///   distributed mode)
/// - `B`: the backing store consulted on a miss
///
/// # Example
///
/// ```ignore
/// let local = Arc::new(LocalMutex::new());
/// let users = CacheAsideOrchestrator::from_config(store, db, local, &config)?;
/// let all = users.get_all().await?;
/// ```
pub struct CacheAsideOrchestrator<T, K, B>
where
    T: CacheableRecord,
    K: KeyValueStore,
    B: BackingStore<T>,
{
    store: Arc<K>,
    backing: Arc<B>,
    mutex: RefillMutex<K>,
    codec: JsonCodec,
    settings: CacheAsideSettings,
    stats: StatsRecorder,
    _record: PhantomData<fn() -> T>,
}

impl<T, K, B> CacheAsideOrchestrator<T, K, B>
where
    T: CacheableRecord,
    K: KeyValueStore,
    B: BackingStore<T>,
{
    /// Create an orchestrator from explicit parts.
    pub fn new(
        store: Arc<K>,
        backing: Arc<B>,
        mutex: RefillMutex<K>,
        settings: CacheAsideSettings,
    ) -> Self {
        Self {
            store,
            backing,
            mutex,
            codec: JsonCodec::new(),
            settings,
            stats: StatsRecorder::default(),
            _record: PhantomData,
        }
    }

    /// Create an orchestrator whose mutex scope follows `config.mutex_strategy`.
    ///
    /// `local` is the process-wide mutex table; it is only used in local mode
    /// but is always injected so every orchestrator in a process shares it.
    pub fn from_config(
        store: Arc<K>,
        backing: Arc<B>,
        local: Arc<LocalMutex>,
        config: &HerdguardConfig,
    ) -> HerdguardResult<Self> {
        config.validate()?;

        let mutex = match config.mutex_strategy {
            MutexStrategy::Local => RefillMutex::Local {
                mutex: local,
                resource: config.keys.data_key.clone(),
                max_wait: config.lock_retry.max_wait,
            },
            MutexStrategy::Distributed => RefillMutex::Distributed(DistributedMutex::new(
                Arc::clone(&store),
                config.keys.lock_key.clone(),
                config.lock_ttl,
                config.lock_retry.clone(),
            )),
        };

        tracing::info!(
            data_key = %config.keys.data_key,
            strategy = %config.mutex_strategy,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "Cache-aside orchestrator configured"
        );

        Ok(Self::new(store, backing, mutex, CacheAsideSettings::from(config)))
    }

    pub fn settings(&self) -> &CacheAsideSettings {
        &self.settings
    }

    pub fn strategy(&self) -> MutexStrategy {
        self.mutex.strategy()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Get every record, from the cache when possible.
    pub async fn get_all(&self) -> HerdguardResult<RecordCollection<T>> {
        if let Some(records) = self.read_cached().await? {
            self.stats.hit();
            tracing::debug!(
                data_key = %self.settings.keys.data_key,
                count = records.len(),
                "Cache hit"
            );
            return Ok(records);
        }
        self.stats.miss();

        let guard = match self.mutex.acquire().await {
            Ok(guard) => guard,
            Err(err) => {
                if err.is_lock_timeout() {
                    self.stats.lock_timeout();
                }
                return Err(err);
            }
        };

        // Nothing between acquire and release may return early. If this
        // future is dropped mid-refill the guard releases on drop.
        let outcome = self.refill_locked().await;

        match self.mutex.release(guard).await {
            Ok(true) => {}
            Ok(false) => self.stats.release_mismatch(),
            Err(err) => {
                tracing::warn!(
                    data_key = %self.settings.keys.data_key,
                    error = %err,
                    "Refill mutex release failed, relying on lock TTL"
                );
            }
        }

        outcome
    }

    /// Drop the cached collection so the next read reloads it.
    ///
    /// Returns true if an entry was removed.
    pub async fn invalidate(&self) -> HerdguardResult<bool> {
        let removed = self.store.delete(&self.settings.keys.data_key).await?;
        tracing::info!(
            data_key = %self.settings.keys.data_key,
            removed,
            "Cache entry invalidated"
        );
        Ok(removed)
    }

    /// Read and decode the cache entry; `None` means take the load path.
    async fn read_cached(&self) -> HerdguardResult<Option<RecordCollection<T>>> {
        let key = &self.settings.keys.data_key;
        let Some(encoded) = self.store.get(key).await? else {
            return Ok(None);
        };
        if encoded.trim().is_empty() {
            return Ok(None);
        }

        match self.codec.decode(key, &encoded) {
            Ok(records) => Ok(Some(records)),
            Err(err) => match self.settings.corrupt_entry_policy {
                CorruptEntryPolicy::Fail => {
                    tracing::warn!(data_key = %key, error = %err, "Cached value failed to decode");
                    Err(err.into())
                }
                CorruptEntryPolicy::Reload => {
                    tracing::warn!(
                        data_key = %key,
                        error = %err,
                        "Cached value failed to decode, reloading from backing store"
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Re-check, load and populate. Caller holds the refill mutex.
    async fn refill_locked(&self) -> HerdguardResult<RecordCollection<T>> {
        if let Some(records) = self.read_cached().await? {
            self.stats.recheck_hit();
            tracing::debug!(
                data_key = %self.settings.keys.data_key,
                "Cache populated by another loader while waiting"
            );
            return Ok(records);
        }

        let records = self.load().await?;
        self.populate(&records).await;
        Ok(records)
    }

    async fn load(&self) -> HerdguardResult<RecordCollection<T>> {
        self.stats.load();
        let deadline = self.settings.load_timeout;

        match tokio::time::timeout(deadline, self.backing.load_all()).await {
            Ok(Ok(records)) => {
                tracing::info!(
                    data_key = %self.settings.keys.data_key,
                    count = records.len(),
                    "Loaded records from backing store"
                );
                Ok(records)
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Backing store load failed");
                Err(err.into())
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = deadline.as_millis() as u64,
                    "Backing store load exceeded deadline"
                );
                Err(LoadError::TimedOut { after: deadline }.into())
            }
        }
    }

    /// Write the encoded collection with the configured TTL.
    ///
    /// Best effort: the caller already has the records, so a failed write
    /// is logged and the next read simply misses again.
    async fn populate(&self, records: &[T]) {
        let key = &self.settings.keys.data_key;
        let encoded = match self.codec.encode(records) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(data_key = %key, error = %err, "Failed to encode records for cache");
                return;
            }
        };

        if let Err(err) = self
            .store
            .set(key, &encoded, Some(self.settings.cache_ttl))
            .await
        {
            tracing::warn!(data_key = %key, error = %err, "Failed to populate cache");
        }
    }
}
