#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chrono::Utc;
use coderelay_protocol::Event;
use coderelay_protocol::EventType;
use coderelay_protocol::Response;

use super::*;

fn options() -> SpoolOptions {
    SpoolOptions {
        ttl: Duration::from_secs(3600),
        max_records: 100,
        compression_threshold_bytes: 512,
    }
}

#[test]
fn test_open_creates_layout() {
    let dir = tempfile::tempdir().unwrap();
    let set = SpoolSet::open(dir.path(), options()).unwrap();

    assert!(set.base().join("events").is_dir());
    assert!(set.base().join("responses").is_dir());

    let sidecar = std::fs::read_to_string(set.base().join("retention.toml")).unwrap();
    assert!(sidecar.contains("ttl_secs = 3600"));
    assert!(sidecar.contains("max_records = 100"));
}

#[test]
fn test_subtrees_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let set = SpoolSet::open(dir.path(), options()).unwrap();

    let event = Event::new(EventType::ApprovalRequest, "test", "Deploy?", "desc");
    set.events().append(&event).unwrap();

    let response = Response::from_callback("approve_t-42", 7, Utc::now());
    set.responses().append(&response).unwrap();

    assert_eq!(set.events().len().unwrap(), 1);
    assert_eq!(set.responses().len().unwrap(), 1);
}
