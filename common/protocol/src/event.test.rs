#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_new_generates_ids() {
    let event = Event::new(EventType::TaskCompletion, "claude-code", "Done", "All tests pass");
    assert!(!event.id.is_empty());
    assert!(!event.task_id.is_empty());
    assert_ne!(event.id, event.task_id);
}

#[test]
fn test_type_serializes_under_wire_name() {
    let event = Event::new(EventType::BuildFailed, "ci", "Build failed", "see log");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "build_failed");
    assert!(json.get("event_type").is_none());
}

#[test]
fn test_empty_data_is_omitted() {
    let event = Event::new(EventType::InfoNotification, "cli", "hi", "hello");
    let json = serde_json::to_value(&event).unwrap();
    assert!(json.get("data").is_none());
}

#[test]
fn test_unknown_data_fields_preserved() {
    let json = serde_json::json!({
        "id": "e-1",
        "type": "performance_alert",
        "source": "monitor",
        "timestamp": "2025-01-01T12:00:00Z",
        "task_id": "t-1",
        "title": "Slow",
        "description": "p95 regression",
        "data": {
            "severity": "high",
            "current_value": 812.0,
            "threshold": 500.0,
            "vendor_tag": {"nested": true}
        }
    });

    let event: Event = serde_json::from_value(json).unwrap();
    assert_eq!(event.data.severity, Some(coderelay_error::Severity::High));
    assert_eq!(event.data.current_value, Some(812.0));
    assert_eq!(
        event.data.extra.get("vendor_tag"),
        Some(&serde_json::json!({"nested": true}))
    );

    // And they survive re-serialization.
    let back = serde_json::to_value(&event).unwrap();
    assert_eq!(back["data"]["vendor_tag"], serde_json::json!({"nested": true}));
}

#[test]
fn test_serialized_size_tracks_description() {
    let small = Event::new(EventType::InfoNotification, "cli", "t", "d");
    let large = Event::new(EventType::InfoNotification, "cli", "t", "d".repeat(4096));
    assert!(large.serialized_size() > small.serialized_size() + 4000);
}

#[test]
fn test_builders() {
    let event = Event::new(EventType::ApprovalRequest, "cli", "Deploy?", "approve to deploy")
        .with_task_id("t-42")
        .with_data(EventData {
            response_options: Some(vec!["Approve".to_string(), "Deny".to_string()]),
            timeout_minutes: Some(30),
            ..Default::default()
        });

    assert_eq!(event.task_id, "t-42");
    assert_eq!(event.data.timeout_minutes, Some(30));
}
