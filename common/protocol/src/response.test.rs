#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_parse_known_actions() {
    let parsed = ParsedCallback::parse("approve_t-42");
    assert_eq!(parsed.action, ResponseAction::Approve);
    assert_eq!(parsed.task_id, "t-42");

    let parsed = ParsedCallback::parse("deny_deploy-7");
    assert_eq!(parsed.action, ResponseAction::Deny);
    assert_eq!(parsed.task_id, "deploy-7");

    let parsed = ParsedCallback::parse("acknowledge_a_b_c");
    assert_eq!(parsed.action, ResponseAction::Acknowledge);
    assert_eq!(parsed.task_id, "a_b_c");

    let parsed = ParsedCallback::parse("details_t-1");
    assert_eq!(parsed.action, ResponseAction::Details);
}

#[test]
fn test_parse_garbage_is_unknown() {
    let parsed = ParsedCallback::parse("garbage");
    assert_eq!(parsed.action, ResponseAction::Unknown);
    assert_eq!(parsed.task_id, "garbage");
}

#[test]
fn test_parse_empty_task_id() {
    let parsed = ParsedCallback::parse("approve_");
    assert_eq!(parsed.action, ResponseAction::Approve);
    assert_eq!(parsed.task_id, "");
}

#[test]
fn test_action_without_separator_is_unknown() {
    let parsed = ParsedCallback::parse("approve");
    assert_eq!(parsed.action, ResponseAction::Unknown);
}

#[test]
fn test_unknown_action_skips_ack() {
    assert!(ResponseAction::Approve.wants_ack());
    assert!(!ResponseAction::Unknown.wants_ack());
}

#[test]
fn test_from_callback() {
    let response = Response::from_callback("approve_t-42", 297126051, Utc::now())
        .with_user(None, Some("Test".to_string()))
        .with_correlation_id("corr-9");

    assert_eq!(response.action, ResponseAction::Approve);
    assert_eq!(response.task_id, "t-42");
    assert_eq!(response.user_id, 297126051);
    assert_eq!(response.first_name.as_deref(), Some("Test"));
    assert_eq!(response.correlation_id.as_deref(), Some("corr-9"));
}

#[test]
fn test_serde_round_trip() {
    let response = Response::from_callback("deny_t-1", 7, Utc::now());
    let json = serde_json::to_string(&response).unwrap();
    let back: Response = serde_json::from_str(&json).unwrap();
    assert_eq!(back.action, ResponseAction::Deny);
    assert_eq!(back.callback_data, "deny_t-1");
}
