//! Exponential backoff with jitter.

use std::time::Duration;

use coderelay_config::RetryConfig;
use rand::Rng;

/// Delay calculator for retry loops.
///
/// Delays grow by `multiplier` per attempt, are capped at `max_delay`, and
/// carry up to `jitter` fractional randomization so synchronized clients
/// do not retry in lockstep. An explicit retry-after hint from the remote
/// side always wins over the computed delay.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    multiplier: f64,
    max: Duration,
    jitter: f64,
}

impl BackoffPolicy {
    /// Create a policy.
    pub fn new(base: Duration, multiplier: f64, max: Duration, jitter: f64) -> Self {
        Self {
            base,
            multiplier,
            max,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn raw_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let ms = self.base.as_millis() as f64 * self.multiplier.powi(exp as i32);
        Duration::from_millis(ms.min(self.max.as_millis() as f64) as u64)
    }

    /// Jittered delay before retry number `attempt` (1-based).
    ///
    /// `retry_after` is an explicit hint from the failing side (e.g. a 429
    /// response); when present it is honored verbatim, capped at `max`.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max);
        }
        let raw = self.raw_delay(attempt);
        if self.jitter == 0.0 {
            return raw;
        }
        let spread = raw.as_millis() as f64 * self.jitter;
        let offset = rand::rng().random_range(-spread..=spread);
        Duration::from_millis(((raw.as_millis() as f64) + offset).max(0.0) as u64)
    }

    /// The configured delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self::new(cfg.base_delay, cfg.multiplier, cfg.max_delay, cfg.jitter)
    }
}

#[cfg(test)]
#[path = "backoff.test.rs"]
mod tests;
