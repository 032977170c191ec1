#![allow(clippy::unwrap_used)]

use std::io::Write;

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_missing_explicit_file_is_error() {
    let err = load(Some(Path::new("/nonexistent/coderelay.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[test]
fn test_loads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[webhook]\nbind = \"0.0.0.0:9000\"").unwrap();

    let config = load(Some(file.path())).unwrap();
    assert_eq!(config.webhook.bind, "0.0.0.0:9000");
}

#[test]
fn test_invalid_toml_is_reported_with_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "not toml [").unwrap();

    let err = load(Some(file.path())).unwrap_err();
    match err {
        ConfigError::InvalidToml { file: f, .. } => assert!(f.contains("tmp")),
        other => panic!("expected InvalidToml, got {other:?}"),
    }
}

#[test]
fn test_parse_bool_values() {
    assert!(parse_bool("V", "true").unwrap());
    assert!(parse_bool("V", "1").unwrap());
    assert!(!parse_bool("V", "no").unwrap());
    assert!(parse_bool("V", "maybe").is_err());
}
