#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

fn keys() -> Vec<String> {
    vec!["api_key".to_string(), "token".to_string()]
}

#[test]
fn test_redacts_top_level_key() {
    let value = serde_json::json!({ "api_key": "sk-secret", "user": "a" });
    let out = redacted(&value, &keys());
    assert_eq!(out["api_key"], REDACTED);
    assert_eq!(out["user"], "a");
}

#[test]
fn test_redacts_nested_and_arrays() {
    let value = serde_json::json!({
        "auth": { "token": "t-123" },
        "items": [{ "api_key": "k" }, { "plain": 1 }]
    });
    let out = redacted(&value, &keys());
    assert_eq!(out["auth"]["token"], REDACTED);
    assert_eq!(out["items"][0]["api_key"], REDACTED);
    assert_eq!(out["items"][1]["plain"], 1);
}

#[test]
fn test_key_match_is_case_insensitive() {
    let value = serde_json::json!({ "API_KEY": "k" });
    let out = redacted(&value, &keys());
    assert_eq!(out["API_KEY"], REDACTED);
}

#[test]
fn test_original_is_untouched() {
    let value = serde_json::json!({ "token": "t" });
    let _ = redacted(&value, &keys());
    assert_eq!(value["token"], "t");
}
