//! The configuration record passed to every component at construction.
//!
//! No component reads globals; the binary loads one [`Config`], validates
//! it, and hands clones (it is cheap, all-owned data) to the parts that
//! need it. Runtime file changes surface as invalidation events from the
//! watcher, never as in-place mutation.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory of the event/response spool.
    pub spool: SpoolConfig,
    /// Inbound auth enforcement.
    pub auth: AuthConfig,
    /// Dispatch-side and webhook-side rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Circuit breaker thresholds.
    pub circuit: CircuitConfig,
    /// Retry policy for outbound operations.
    pub retry: RetryConfig,
    /// Memory monitor thresholds.
    pub memory: MemoryConfig,
    /// Heap dump capture.
    pub heap_dumps: HeapDumpConfig,
    /// Logging.
    pub log: LogConfig,
    /// Bridge worker supervision.
    pub bridge: BridgeConfig,
    /// Payload limits.
    pub limits: LimitsConfig,
    /// Webhook listener.
    pub webhook: WebhookConfig,
    /// Recovery orchestrator bounds.
    pub recovery: RecoveryConfig,
}

/// Spool location and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolConfig {
    /// Base directory; `events/` and `responses/` live under it.
    pub dir: PathBuf,
    /// Time-to-live for spooled records.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Absolute record count cap per subtree.
    pub max_records: usize,
    /// Records above this serialized size are compressed.
    pub compression_threshold_bytes: usize,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            dir: default_spool_dir(),
            ttl: Duration::from_secs(24 * 60 * 60),
            max_records: 10_000,
            compression_threshold_bytes: 512,
        }
    }
}

fn default_spool_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coderelay")
        .join("spool")
}

/// Inbound authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared API key expected in the `x-api-key` header.
    pub api_key: Option<String>,
    /// Whether inbound auth is enforced.
    pub enable: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            enable: true,
        }
    }
}

/// Token bucket parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Bucket capacity per chat target.
    pub capacity: u32,
    /// Tokens refilled per second.
    pub refill_per_sec: f64,
    /// Queued events allowed past an empty bucket before backpressure.
    pub queue_high_water: usize,
    /// Webhook requests allowed per source per minute.
    pub webhook_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            refill_per_sec: 1.0,
            queue_high_water: 256,
            webhook_per_minute: 60,
        }
    }
}

/// Circuit breaker thresholds shared by middleware and supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Consecutive failures within `window` that open the circuit.
    pub failure_threshold: u32,
    /// Failure counting window.
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// How long an open circuit rejects before half-open.
    #[serde(with = "humantime_serde")]
    pub cool_down: Duration,
    /// Cap on the doubled cool-down after a failed half-open probe.
    #[serde(with = "humantime_serde")]
    pub max_cool_down: Duration,
    /// Successful half-open probes required to close.
    pub half_open_probes: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            cool_down: Duration::from_secs(30),
            max_cool_down: Duration::from_secs(300),
            half_open_probes: 1,
        }
    }
}

/// Retry policy for operations wrapped by the resilience middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Delay cap.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Jitter fraction in [0, 1] applied to each delay.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

/// Memory monitor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Hard heap cap in MiB.
    pub max_heap_mb: u64,
    /// Growth-rate threshold in MiB per minute.
    pub growth_mb_per_min: f64,
    /// Snapshot interval in milliseconds.
    pub snapshot_ms: u64,
    /// Alert cooldown per (kind, area).
    #[serde(with = "humantime_serde")]
    pub alert_cooldown: Duration,
    /// Spooled file count that triggers a file-accumulation alert.
    pub max_spool_files: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_heap_mb: 50,
            growth_mb_per_min: 10.0,
            snapshot_ms: 30_000,
            alert_cooldown: Duration::from_secs(300),
            max_spool_files: 1_000,
        }
    }
}

/// Heap dump capture on memory alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapDumpConfig {
    /// Whether dumps are written at all.
    pub enabled: bool,
    /// Directory dumps are written to.
    pub dir: PathBuf,
    /// Retained dump count; oldest are removed first.
    pub max: usize,
}

impl Default for HeapDumpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("heap-dumps"),
            max: 3,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (e.g. `info`, `coderelay=debug`).
    pub level: String,
    /// Keys whose values must never reach log output.
    pub redact_keys: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            redact_keys: vec!["api_key".to_string(), "token".to_string()],
        }
    }
}

/// Bridge worker supervision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Command used to launch the worker.
    pub command: String,
    /// Arguments passed to the worker.
    pub args: Vec<String>,
    /// Health endpoint URL polled by the supervisor.
    pub health_endpoint: String,
    /// Startup deadline in milliseconds.
    pub startup_deadline_ms: u64,
    /// Health poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Restart backoff parameters.
    pub restart_backoff: RestartBackoffConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: "coderelay-worker".to_string(),
            args: Vec::new(),
            health_endpoint: "http://127.0.0.1:8081/health".to_string(),
            startup_deadline_ms: 10_000,
            poll_interval_ms: 2_000,
            restart_backoff: RestartBackoffConfig::default(),
        }
    }
}

/// Exponential backoff between worker restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartBackoffConfig {
    /// First restart delay in milliseconds.
    pub base_ms: u64,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Delay cap in milliseconds.
    pub max_ms: u64,
    /// Restarts within `window` that trip the bridge circuit.
    pub max_restarts: u32,
    /// Restart counting window.
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RestartBackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            multiplier: 2.0,
            max_ms: 60_000,
            max_restarts: 5,
            window: Duration::from_secs(300),
        }
    }
}

/// Payload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum serialized event size in bytes.
    pub max_event_bytes: usize,
    /// Maximum title length in characters.
    pub max_title_chars: usize,
    /// Maximum description length in characters.
    pub max_description_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_event_bytes: 100 * 1024,
            max_title_chars: 200,
            max_description_chars: 2_000,
        }
    }
}

/// Webhook listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Bind address, e.g. `127.0.0.1:8082`.
    pub bind: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8082".to_string(),
        }
    }
}

/// Recovery orchestrator bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Maximum concurrent recovery executions.
    pub max_concurrent: usize,
    /// Overall plan deadline.
    #[serde(with = "humantime_serde")]
    pub plan_deadline: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            plan_deadline: Duration::from_secs(120),
        }
    }
}

impl Config {
    /// Validate cross-field constraints.
    ///
    /// Called once at startup; a failure here is the exit-code-1 path.
    pub fn validate(&self) -> Result<()> {
        if self.auth.enable && self.auth.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Invalid(
                "auth.enable requires auth.api_key".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError::Invalid(
                "retry.jitter must be within [0, 1]".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be >= 1".to_string(),
            ));
        }
        if self.circuit.failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuit.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.circuit.max_cool_down < self.circuit.cool_down {
            return Err(ConfigError::Invalid(
                "circuit.max_cool_down must be >= circuit.cool_down".to_string(),
            ));
        }
        if self.limits.max_event_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_event_bytes must be positive".to_string(),
            ));
        }
        if self.recovery.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "recovery.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.memory.max_heap_mb == 0 {
            return Err(ConfigError::Invalid(
                "memory.max_heap_mb must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config.test.rs"]
mod tests;
