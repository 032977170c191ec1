//! coderelay-config - Configuration record, loader and file watcher.

mod config;
mod error;
mod loader;
mod redact;
mod watcher;

pub use config::AuthConfig;
pub use config::BridgeConfig;
pub use config::CircuitConfig;
pub use config::Config;
pub use config::HeapDumpConfig;
pub use config::LimitsConfig;
pub use config::LogConfig;
pub use config::MemoryConfig;
pub use config::RateLimitConfig;
pub use config::RecoveryConfig;
pub use config::RestartBackoffConfig;
pub use config::RetryConfig;
pub use config::SpoolConfig;
pub use config::WebhookConfig;
pub use error::ConfigError;
pub use error::Result;
pub use loader::default_config_path;
pub use loader::load;
pub use redact::REDACTED;
pub use redact::redact_value;
pub use redact::redacted;
pub use watcher::ConfigInvalidated;
pub use watcher::ConfigWatcher;
