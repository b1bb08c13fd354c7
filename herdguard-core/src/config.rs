//! Configuration types

use crate::error::{ConfigError, HerdguardError, HerdguardResult};
use crate::keys::CacheKeys;
use crate::retry::LockRetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// MUTEX STRATEGY
// ============================================================================

/// Which mutual-exclusion scope guards a cache refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutexStrategy {
    /// In-process mutex; only safe with a single replica.
    Local,
    /// Mutex held in the shared key-value store; required with multiple replicas.
    Distributed,
}

impl MutexStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutexStrategy::Local => "local",
            MutexStrategy::Distributed => "distributed",
        }
    }
}

impl fmt::Display for MutexStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutexStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(MutexStrategy::Local),
            "distributed" => Ok(MutexStrategy::Distributed),
            _ => Err(ConfigError::InvalidValue {
                field: "mutex_strategy".to_string(),
                value: s.to_string(),
                reason: "expected 'local' or 'distributed'".to_string(),
            }),
        }
    }
}

// ============================================================================
// CORRUPT ENTRY POLICY
// ============================================================================

/// What to do when the cached value does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CorruptEntryPolicy {
    /// Surface the decode error to the caller.
    #[default]
    Fail,
    /// Log the corruption and take the load path, overwriting the entry.
    Reload,
}

impl CorruptEntryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorruptEntryPolicy::Fail => "fail",
            CorruptEntryPolicy::Reload => "reload",
        }
    }
}

impl FromStr for CorruptEntryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(CorruptEntryPolicy::Fail),
            "reload" => Ok(CorruptEntryPolicy::Reload),
            _ => Err(ConfigError::InvalidValue {
                field: "corrupt_entry_policy".to_string(),
                value: s.to_string(),
                reason: "expected 'fail' or 'reload'".to_string(),
            }),
        }
    }
}

// ============================================================================
// MASTER CONFIG
// ============================================================================

/// Default lock TTL: a liveness ceiling against a crashed holder.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(300);

/// Default cache TTL applied on every repopulation.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default deadline for one backing-store load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Cache-aside configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HerdguardConfig {
    pub keys: CacheKeys,
    /// TTL of the cached collection
    pub cache_ttl: Duration,
    /// TTL of the distributed lock entry
    pub lock_ttl: Duration,
    pub mutex_strategy: MutexStrategy,
    pub lock_retry: LockRetryPolicy,
    /// Deadline for a single backing-store load
    pub load_timeout: Duration,
    pub corrupt_entry_policy: CorruptEntryPolicy,
    /// Connection URL for the Redis backend, when that backend is used
    pub redis_url: Option<String>,
}

impl Default for HerdguardConfig {
    fn default() -> Self {
        Self {
            keys: CacheKeys::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            lock_ttl: DEFAULT_LOCK_TTL,
            mutex_strategy: MutexStrategy::Local,
            lock_retry: LockRetryPolicy::default(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            corrupt_entry_policy: CorruptEntryPolicy::Fail,
            redis_url: None,
        }
    }
}

impl HerdguardConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `HERDGUARD_DATA_KEY`: cache key of the collection (default: allUsers)
    /// - `HERDGUARD_LOCK_KEY`: key of the distributed lock (default: lock)
    /// - `HERDGUARD_CACHE_TTL_SECS`: cache TTL (default: 600)
    /// - `HERDGUARD_LOCK_TTL_SECS`: lock TTL (default: 300)
    /// - `HERDGUARD_MUTEX_STRATEGY`: `local` or `distributed` (default: local)
    /// - `HERDGUARD_LOCK_MAX_WAIT_MS`: lock acquisition budget (default: 10000)
    /// - `HERDGUARD_LOCK_MAX_ATTEMPTS`: lock acquisition attempts (default: 50)
    /// - `HERDGUARD_LOAD_TIMEOUT_MS`: backing-store load deadline (default: 30000)
    /// - `HERDGUARD_CORRUPT_ENTRY_POLICY`: `fail` or `reload` (default: fail)
    /// - `HERDGUARD_REDIS_URL`: Redis connection URL (default: unset)
    pub fn from_env() -> HerdguardResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`HerdguardConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> HerdguardResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(data_key) = lookup("HERDGUARD_DATA_KEY") {
            config.keys.data_key = data_key;
        }
        if let Some(lock_key) = lookup("HERDGUARD_LOCK_KEY") {
            config.keys.lock_key = lock_key;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "HERDGUARD_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "HERDGUARD_LOCK_TTL_SECS")? {
            config.lock_ttl = Duration::from_secs(secs);
        }
        if let Some(strategy) = lookup("HERDGUARD_MUTEX_STRATEGY") {
            config.mutex_strategy = strategy.parse()?;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "HERDGUARD_LOCK_MAX_WAIT_MS")? {
            config.lock_retry.max_wait = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "HERDGUARD_LOCK_MAX_ATTEMPTS")? {
            config.lock_retry.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "HERDGUARD_LOAD_TIMEOUT_MS")? {
            config.load_timeout = Duration::from_millis(ms);
        }
        if let Some(policy) = lookup("HERDGUARD_CORRUPT_ENTRY_POLICY") {
            config.corrupt_entry_policy = policy.parse()?;
        }
        config.redis_url = lookup("HERDGUARD_REDIS_URL");

        Ok(config)
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(HerdguardError::Config) if invalid.
    ///
    /// Validates:
    /// - data key and lock key are distinct
    /// - all durations are positive
    /// - lock_ttl is at least load_timeout
    /// - retry policy has at least one attempt and a multiplier >= 1.0
    pub fn validate(&self) -> HerdguardResult<()> {
        if !self.keys.is_distinct() {
            return Err(HerdguardError::Config(ConfigError::IncompatibleOptions {
                option_a: format!("data_key={}", self.keys.data_key),
                option_b: format!("lock_key={}", self.keys.lock_key),
            }));
        }

        for (field, value) in [
            ("cache_ttl", self.cache_ttl),
            ("lock_ttl", self.lock_ttl),
            ("load_timeout", self.load_timeout),
            ("lock_retry.max_wait", self.lock_retry.max_wait),
        ] {
            if value.is_zero() {
                return Err(invalid(field, format!("{:?}", value), "must be positive"));
            }
        }

        // A lock that can expire mid-load lets a second loader in.
        if self.lock_ttl < self.load_timeout {
            return Err(invalid(
                "lock_ttl",
                format!("{:?}", self.lock_ttl),
                "lock_ttl must be at least load_timeout",
            ));
        }

        if self.lock_retry.max_attempts == 0 {
            return Err(invalid(
                "lock_retry.max_attempts",
                "0".to_string(),
                "max_attempts must be at least 1",
            ));
        }

        let multiplier = self.lock_retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(invalid(
                "lock_retry.backoff_multiplier",
                self.lock_retry.backoff_multiplier.to_string(),
                "backoff_multiplier must be >= 1.0",
            ));
        }

        if self.lock_retry.initial_backoff > self.lock_retry.max_backoff {
            return Err(invalid(
                "lock_retry.initial_backoff",
                format!("{:?}", self.lock_retry.initial_backoff),
                "initial_backoff must not exceed max_backoff",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: String, reason: &str) -> HerdguardError {
    HerdguardError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    })
}

fn parse_var<T, F>(lookup: &F, name: &str) -> HerdguardResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(name, raw.clone(), "not a valid number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = HerdguardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lock_ttl, Duration::from_secs(300));
        assert_eq!(config.keys.data_key, "allUsers");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = HerdguardConfig::from_lookup(lookup_from(&[
            ("HERDGUARD_MUTEX_STRATEGY", "Distributed"),
            ("HERDGUARD_CACHE_TTL_SECS", "60"),
            ("HERDGUARD_LOCK_MAX_WAIT_MS", "250"),
            ("HERDGUARD_CORRUPT_ENTRY_POLICY", "reload"),
            ("HERDGUARD_REDIS_URL", "redis://127.0.0.1:6379"),
        ]))
        .unwrap();

        assert_eq!(config.mutex_strategy, MutexStrategy::Distributed);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.lock_retry.max_wait, Duration::from_millis(250));
        assert_eq!(config.corrupt_entry_policy, CorruptEntryPolicy::Reload);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = HerdguardConfig::from_lookup(lookup_from(&[(
            "HERDGUARD_LOCK_TTL_SECS",
            "five minutes",
        )]))
        .unwrap_err();
        assert!(matches!(err, HerdguardError::Config(ConfigError::InvalidValue { .. })));

        let err = HerdguardConfig::from_lookup(lookup_from(&[(
            "HERDGUARD_MUTEX_STRATEGY",
            "zookeeper",
        )]))
        .unwrap_err();
        assert!(matches!(err, HerdguardError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_shared_key() {
        let mut config = HerdguardConfig::default();
        config.keys = CacheKeys::new("same", "same");
        assert!(matches!(
            config.validate(),
            Err(HerdguardError::Config(ConfigError::IncompatibleOptions { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_lock_ttl_below_load_timeout() {
        let mut config = HerdguardConfig::default();
        config.lock_ttl = Duration::from_secs(5);
        config.load_timeout = Duration::from_secs(30);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = HerdguardConfig::default();
        config.lock_retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mutex_strategy_round_trips_through_str() {
        for strategy in [MutexStrategy::Local, MutexStrategy::Distributed] {
            assert_eq!(strategy.as_str().parse::<MutexStrategy>().unwrap(), strategy);
        }
    }
}
