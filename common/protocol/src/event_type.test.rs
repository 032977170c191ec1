#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_wire_round_trip() {
    for tag in EventType::known() {
        let parsed = EventType::parse(tag.as_str());
        assert_eq!(parsed, tag);
    }
}

#[test]
fn test_unknown_becomes_extension() {
    let tag = EventType::parse("quantum_flux");
    assert_eq!(tag, EventType::Extension("quantum_flux".to_string()));
    assert_eq!(tag.as_str(), "quantum_flux");
    assert!(!tag.is_known());
}

#[test]
fn test_serde_as_plain_string() {
    let json = serde_json::to_string(&EventType::ApprovalRequest).unwrap();
    assert_eq!(json, "\"approval_request\"");

    let back: EventType = serde_json::from_str("\"task_completion\"").unwrap();
    assert_eq!(back, EventType::TaskCompletion);
}

#[test]
fn test_extension_serde_round_trip() {
    let tag = EventType::Extension("vendor_custom".to_string());
    let json = serde_json::to_string(&tag).unwrap();
    let back: EventType = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tag);
}

#[test]
fn test_known_excludes_extension() {
    let known = EventType::known();
    assert!(known.len() >= 40);
    assert!(known.iter().all(EventType::is_known));
}

#[test]
fn test_display() {
    assert_eq!(EventType::PerformanceAlert.to_string(), "performance_alert");
}
