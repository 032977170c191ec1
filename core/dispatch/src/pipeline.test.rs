#![allow(clippy::unwrap_used)]

use coderelay_spool::SpoolOptions;
use pretty_assertions::assert_eq;

use super::*;
use crate::fanout::Notice;

fn limits() -> LimitsConfig {
    LimitsConfig {
        max_event_bytes: 8 * 1024,
        max_title_chars: 100,
        max_description_chars: 500,
    }
}

fn rate_config() -> RateLimitConfig {
    RateLimitConfig {
        capacity: 100,
        refill_per_sec: 100.0,
        queue_high_water: 50,
        webhook_per_minute: 60,
    }
}

fn pipeline(dir: &tempfile::TempDir) -> DispatchPipeline {
    let spool = Arc::new(
        SpoolSet::open(
            dir.path(),
            SpoolOptions {
                ttl: Duration::from_secs(3600),
                max_records: 1000,
                compression_threshold_bytes: 512,
            },
        )
        .unwrap(),
    );
    DispatchPipeline::new(spool, limits(), &rate_config(), 32)
}

fn event(title: &str, description: &str) -> Event {
    Event::new(EventType::TaskCompletion, "claude-code", title, description)
}

#[test]
fn test_send_event_spools_and_receipts() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    let receipt = p.send_event(event("done", "all good")).unwrap();
    assert!(receipt.accepted);
    assert!(!receipt.event_id.is_empty());
    assert_eq!(p.spool().events().len().unwrap(), 1);
}

#[test]
fn test_missing_ids_are_generated() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    let mut ev = event("t", "d");
    ev.id = String::new();
    ev.task_id = String::new();

    let receipt = p.send_event(ev).unwrap();
    assert!(!receipt.event_id.is_empty());
}

#[test]
fn test_oversize_description_is_rejected_without_spooling() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    let err = p.send_event(event("t", &"d".repeat(600))).unwrap_err();
    assert!(matches!(err, DispatchError::Validation { .. }));
    assert_eq!(p.spool().events().len().unwrap(), 0);
}

#[test]
fn test_oversize_payload_is_size_limit() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    // Pack the attribute bag instead of the bounded description.
    let mut ev = event("t", "d");
    ev.data.extra.insert(
        "blob".to_string(),
        serde_json::json!("x".repeat(10 * 1024)),
    );

    let err = p.send_event(ev).unwrap_err();
    assert!(matches!(err, DispatchError::SizeLimit { .. }));
    assert_eq!(p.spool().events().len().unwrap(), 0);
}

#[test]
fn test_empty_title_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);
    let err = p.send_event(event("  ", "d")).unwrap_err();
    assert!(matches!(err, DispatchError::Validation { .. }));
}

#[test]
fn test_per_source_timestamps_are_monotonic() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    let base = Utc::now();
    let mut first = event("one", "d");
    first.timestamp = base;
    let mut second = event("two", "d");
    second.timestamp = base - chrono::Duration::seconds(10);

    p.send_event(first).unwrap();
    p.send_event(second).unwrap();

    let records = p.spool().events().iterate(None).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[1].record.timestamp > records[0].record.timestamp);
}

#[test]
fn test_backpressure_past_high_water() {
    let dir = tempfile::tempdir().unwrap();
    let spool = Arc::new(
        SpoolSet::open(
            dir.path(),
            SpoolOptions {
                ttl: Duration::from_secs(3600),
                max_records: 1000,
                compression_threshold_bytes: 512,
            },
        )
        .unwrap(),
    );
    let p = DispatchPipeline::new(
        spool,
        limits(),
        &RateLimitConfig {
            capacity: 2,
            refill_per_sec: 0.0,
            queue_high_water: 3,
            webhook_per_minute: 60,
        },
        32,
    );

    // Two tokens, then queueing until the spool backlog hits high water.
    p.send_event(event("1", "d")).unwrap();
    p.send_event(event("2", "d")).unwrap();
    p.send_event(event("3", "d")).unwrap();

    let err = p.send_event(event("4", "d")).unwrap_err();
    assert!(matches!(err, DispatchError::Backpressure { .. }));
}

#[test]
fn test_send_message_builds_info_event() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    p.send_message("build finished in 32s", "ci").unwrap();
    let records = p.spool().events().iterate(None).unwrap();
    assert_eq!(records[0].record.event_type, EventType::InfoNotification);
    assert_eq!(records[0].record.source, "ci");
}

#[test]
fn test_typed_helpers_fill_data() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    p.send_task_completion("t-42", "Refactor done", Some("12 files".to_string()), Some(90_000))
        .unwrap();
    p.send_performance_alert("Slow dispatch", 812.0, 500.0, Severity::High)
        .unwrap();
    p.send_approval_request("Deploy?", "v1.2 to prod", Vec::new(), Some(30), Some("t-43".to_string()))
        .unwrap();

    let records = p.spool().events().iterate(None).unwrap();
    assert_eq!(records.len(), 3);
    let by_type = |t: EventType| {
        records
            .iter()
            .map(|r| &r.record)
            .find(|e| e.event_type == t)
            .unwrap()
    };

    let completion = by_type(EventType::TaskCompletion);
    assert_eq!(completion.task_id, "t-42");
    assert_eq!(completion.data.duration_ms, Some(90_000));

    let alert = by_type(EventType::PerformanceAlert);
    assert_eq!(alert.data.severity, Some(Severity::High));
    assert_eq!(alert.data.threshold, Some(500.0));

    let approval = by_type(EventType::ApprovalRequest);
    assert_eq!(approval.task_id, "t-43");
    assert_eq!(
        approval.data.response_options,
        Some(vec!["Approve".to_string(), "Deny".to_string()])
    );
}

#[test]
fn test_response_queries() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    let old = Response::from_callback("approve_t-1", 7, Utc::now() - chrono::Duration::hours(3));
    let recent = Response::from_callback("deny_t-2", 7, Utc::now());
    p.accept_response(old).unwrap();
    p.accept_response(recent).unwrap();

    let latest = p.get_responses(10).unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].callback_data, "deny_t-2");

    let pending = p.process_pending_responses(Duration::from_secs(3600)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].callback_data, "deny_t-2");

    let limited = p.get_responses(1).unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_clear_old_responses() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    let old = Response::from_callback("approve_t-1", 7, Utc::now() - chrono::Duration::hours(3));
    p.accept_response(old).unwrap();
    let removed = p.clear_old_responses(Duration::from_secs(3600)).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(p.get_responses(10).unwrap().len(), 0);
}

#[tokio::test]
async fn test_accept_response_notifies_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);
    let mut sub = p.fanout().subscribe();

    let response = Response::from_callback("approve_t-42", 297126051, Utc::now());
    p.accept_response(response).unwrap();

    match sub.recv().await.unwrap() {
        Notice::Notification(n) => {
            assert_eq!(n.kind, NotificationKind::ResponseReceived);
            assert_eq!(n.response.unwrap().task_id, "t-42");
        }
        Notice::ConsumerLagged { .. } => panic!("unexpected lag"),
    }
}

#[test]
fn test_degradation_pauses_low_priority_only() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);

    p.pause_low_priority(true);

    let info = Event::new(EventType::InfoNotification, "cli", "hello", "world");
    assert!(p.send_event(info).is_err());

    let failure = Event::new(EventType::TaskFailed, "cli", "broke", "details");
    assert!(p.send_event(failure).is_ok());

    p.pause_low_priority(false);
    let info = Event::new(EventType::InfoNotification, "cli", "hello", "again");
    assert!(p.send_event(info).is_ok());
}

#[test]
fn test_closed_pipeline_refuses_intake() {
    let dir = tempfile::tempdir().unwrap();
    let p = pipeline(&dir);
    p.close();
    let err = p.send_event(event("t", "d")).unwrap_err();
    assert!(matches!(err, DispatchError::ShuttingDown { .. }));
}
