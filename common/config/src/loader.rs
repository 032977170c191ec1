//! Config loading: TOML file plus `CODERELAY_*` environment overrides.

use std::path::Path;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::ConfigError;
use crate::error::Result;

/// Load configuration from an optional file, then apply env overrides.
///
/// A missing explicit path is an error; a missing default path falls back
/// to built-in defaults.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::FileNotFound(p.display().to_string()));
            }
            parse_file(p)?
        }
        None => {
            let default = default_config_path();
            if default.exists() {
                parse_file(&default)?
            } else {
                Config::default()
            }
        }
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Default config file location: `<config dir>/coderelay/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coderelay")
        .join("config.toml")
}

fn parse_file(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)?;
    toml::from_str(&raw).map_err(|e| ConfigError::InvalidToml {
        file: path.display().to_string(),
        error: e.to_string(),
    })
}

/// Apply the recognized `CODERELAY_*` environment overrides.
///
/// Only scalar leaves can be overridden; list-valued settings stay in the
/// file.
fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(v) = std::env::var("CODERELAY_SPOOL_DIR") {
        config.spool.dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("CODERELAY_AUTH_API_KEY") {
        config.auth.api_key = Some(v);
    }
    if let Ok(v) = std::env::var("CODERELAY_AUTH_ENABLE") {
        config.auth.enable = parse_bool("CODERELAY_AUTH_ENABLE", &v)?;
    }
    if let Ok(v) = std::env::var("CODERELAY_LOG_LEVEL") {
        config.log.level = v;
    }
    if let Ok(v) = std::env::var("CODERELAY_WEBHOOK_BIND") {
        config.webhook.bind = v;
    }
    if let Ok(v) = std::env::var("CODERELAY_BRIDGE_HEALTH_ENDPOINT") {
        config.bridge.health_endpoint = v;
    }
    if let Ok(v) = std::env::var("CODERELAY_MEMORY_MAX_HEAP_MB") {
        config.memory.max_heap_mb = parse_num("CODERELAY_MEMORY_MAX_HEAP_MB", &v)?;
    }
    Ok(())
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ConfigError::InvalidEnvValue {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
#[path = "loader.test.rs"]
mod tests;
