//! Retry policy and backoff computation.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default total attempts (1 initial + 3 retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default backoff base in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default backoff ceiling in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// Retry configuration, fixed for the lifetime of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Backoff base in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds (before jitter).
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new(1, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS)
    }

    /// Total attempts, never less than one.
    #[must_use]
    pub const fn effective_max_attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Unjittered delay `min(max_delay_ms, base_delay_ms * 2^exponent)`.
    #[must_use]
    pub const fn backoff_ms(&self, exponent: u32) -> u64 {
        let factor = match 1u64.checked_shl(exponent) {
            Some(f) => f,
            None => u64::MAX,
        };
        let raw = self.base_delay_ms.saturating_mul(factor);
        if raw < self.max_delay_ms {
            raw
        } else {
            self.max_delay_ms
        }
    }

    /// Unjittered delay before retry number `retry` (1 for the first retry).
    ///
    /// The first retry waits `base_delay_ms`, each subsequent retry doubles it.
    #[must_use]
    pub const fn delay_before_retry_ms(&self, retry: u32) -> u64 {
        self.backoff_ms(retry.saturating_sub(1))
    }
}

/// Largest jitter that may be added to `delay_ms`: `floor(0.2 * delay_ms)`.
#[must_use]
pub const fn max_jitter_ms(delay_ms: u64) -> u64 {
    delay_ms / 5
}

/// Source of the random jitter added to each backoff delay.
pub trait JitterSource: Send + Sync + fmt::Debug {
    /// Return a value in `[0, max_ms]`.
    fn jitter_ms(&self, max_ms: u64) -> u64;
}

/// Uniformly distributed jitter from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformJitter;

impl JitterSource for UniformJitter {
    fn jitter_ms(&self, max_ms: u64) -> u64 {
        if max_ms == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..=max_ms)
    }
}

/// No jitter; delays are exactly the backoff value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn jitter_ms(&self, _max_ms: u64) -> u64 {
        0
    }
}

/// Total jittered delay for a retry.
pub(crate) fn jittered_delay(
    policy: &RetryPolicy,
    retry: u32,
    jitter: &dyn JitterSource,
) -> Duration {
    let base = policy.delay_before_retry_ms(retry);
    let bound = max_jitter_ms(base);
    let extra = jitter.jitter_ms(bound).min(bound);
    Duration::from_millis(base.saturating_add(extra))
}
