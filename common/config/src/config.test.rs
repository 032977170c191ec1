#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_defaults_validate() {
    let mut config = Config::default();
    // Default enables auth but ships no key; give it one.
    config.auth.api_key = Some("k".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_auth_enabled_requires_key() {
    let config = Config::default();
    assert!(config.auth.enable);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("auth.api_key"));
}

#[test]
fn test_auth_disabled_needs_no_key() {
    let mut config = Config::default();
    config.auth.enable = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_rejects_zero_attempts() {
    let mut config = Config::default();
    config.auth.enable = false;
    config.retry.max_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_rejects_bad_jitter() {
    let mut config = Config::default();
    config.auth.enable = false;
    config.retry.jitter = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_rejects_inverted_cool_down() {
    let mut config = Config::default();
    config.auth.enable = false;
    config.circuit.max_cool_down = std::time::Duration::from_secs(1);
    assert!(config.validate().is_err());
}

#[test]
fn test_parses_toml_sections() {
    let raw = r#"
        [spool]
        dir = "/tmp/spool"
        ttl = "1h"
        max_records = 500

        [auth]
        api_key = "secret"
        enable = true

        [retry]
        max_attempts = 5
        base_delay = "250ms"

        [bridge]
        health_endpoint = "http://localhost:9999/health"
        startup_deadline_ms = 5000

        [bridge.restart_backoff]
        base_ms = 100
        max_restarts = 3
        window = "2m"
    "#;

    let config: Config = toml::from_str(raw).unwrap();
    assert_eq!(config.spool.dir, std::path::PathBuf::from("/tmp/spool"));
    assert_eq!(config.spool.ttl, std::time::Duration::from_secs(3600));
    assert_eq!(config.spool.max_records, 500);
    // Unspecified fields keep defaults.
    assert_eq!(config.spool.compression_threshold_bytes, 512);
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.base_delay, std::time::Duration::from_millis(250));
    assert_eq!(config.bridge.restart_backoff.max_restarts, 3);
    assert_eq!(config.memory.max_heap_mb, 50);
    assert!(config.validate().is_ok());
}
