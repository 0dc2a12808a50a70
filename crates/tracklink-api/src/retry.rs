// Backoff policy for vendor calls.
//
// Linear backoff (`attempt * base_delay`) with optional random jitter.
// The policy is plain data: it computes delays but never sleeps, so
// callers and tests can reason about the schedule without timers.

use std::time::Duration;

use rand::Rng;

/// How many times to try a vendor call and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `n * base_delay`.
    pub base_delay: Duration,
    /// Upper bound of the uniformly random extra delay added to each wait.
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_secs(1))
    }
}

impl BackoffPolicy {
    /// Linear backoff without jitter.
    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter: Duration::ZERO,
        }
    }

    /// Exactly one attempt, no retries.
    pub fn single() -> Self {
        Self::linear(1, Duration::ZERO)
    }

    /// Add up to `max_jitter` of random delay to every wait.
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Deterministic part of the wait after the given (1-based) attempt.
    pub fn base_delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Full wait after the given attempt, jitter included.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = self.base_delay_after(attempt);
        if self.max_jitter.is_zero() {
            return base;
        }
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = rand::thread_rng().gen_range(0..=max_ms);
        base.saturating_add(Duration::from_millis(jitter_ms))
    }
}
