//! Bounded retry policy for lock acquisition.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long and how often a caller keeps retrying a busy lock.
///
/// Retrying stops at whichever comes first: `max_attempts` tries or
/// `max_wait` of total wall-clock time. Delays grow exponentially from
/// `initial_backoff` up to `max_backoff`, with equal jitter applied so
/// contending replicas spread out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRetryPolicy {
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration for a single sleep
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_attempts: u32,
    /// Total wall-clock budget for one acquisition
    pub max_wait: Duration,
}

impl Default for LockRetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_attempts: 50,
            max_wait: Duration::from_secs(10),
        }
    }
}

impl LockRetryPolicy {
    /// Set the total wall-clock budget.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the initial and maximum backoff.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Un-jittered delay before retry number `attempt` (0-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(64) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = secs.min(self.max_backoff.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            // Near Duration::MAX the f64 rounds past the representable range.
            Duration::try_from_secs_f64(capped).unwrap_or(self.max_backoff)
        } else {
            Duration::ZERO
        }
    }

    /// Delay with equal jitter: half of the base delay is fixed, the other
    /// half is drawn uniformly from `rng`.
    pub fn jittered_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(attempt);
        let fixed = base / 2;
        let spread = (base - fixed).as_micros() as u64;
        fixed + Duration::from_micros(rng.random_range(0..=spread))
    }

    /// Jittered delay using the thread-local RNG.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.jittered_delay(attempt, &mut rand::rng())
    }
}
