//! Per-target token buckets for chat-bound traffic.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use coderelay_config::RateLimitConfig;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token buckets keyed by chat target.
///
/// An empty bucket does not reject by itself; the pipeline lets events
/// queue in the spool until the high-water mark, and only then reports
/// backpressure.
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Create buckets from config.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            capacity: f64::from(config.capacity.max(1)),
            refill_per_sec: config.refill_per_sec.max(0.0),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token for `target`; false when the bucket is empty.
    pub fn try_acquire(&self, target: &str) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let bucket = buckets.entry(target.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Remaining tokens for a target (for gauges).
    pub fn available(&self, target: &str) -> f64 {
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.get(target).map_or(self.capacity, |b| b.tokens)
    }
}

#[cfg(test)]
#[path = "rate.test.rs"]
mod tests;
