//! Fixed-window per-source rate limiting for the webhook.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

struct Window {
    started: Instant,
    count: u32,
}

/// Allows `limit` requests per source per minute.
pub struct SourceRateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl SourceRateLimiter {
    /// Create a limiter with a one-minute window.
    pub fn per_minute(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            window: Duration::from_secs(60),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the source may proceed; counts the request when allowed.
    pub fn allow(&self, source: &str) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let window = windows.entry(source.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) > self.window {
            window.started = now;
            window.count = 0;
        }
        if window.count >= self.limit {
            return false;
        }
        window.count += 1;
        true
    }
}

#[cfg(test)]
#[path = "rate.test.rs"]
mod tests;
