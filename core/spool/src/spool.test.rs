#![allow(clippy::unwrap_used)]

use coderelay_protocol::Event;
use coderelay_protocol::EventType;
use pretty_assertions::assert_eq;

use super::*;

fn options() -> SpoolOptions {
    SpoolOptions {
        ttl: Duration::from_secs(3600),
        max_records: 100,
        compression_threshold_bytes: 512,
    }
}

fn event(title: &str, description: &str) -> Event {
    Event::new(EventType::TaskCompletion, "test", title, description)
}

fn open_spool(dir: &tempfile::TempDir) -> Spool<Event> {
    Spool::open(dir.path().join("events"), options()).unwrap()
}

#[test]
fn test_append_creates_file_and_returns_id() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);

    let ev = event("done", "short");
    let id = spool.append(&ev).unwrap();
    assert_eq!(id, ev.id);
    assert_eq!(spool.len().unwrap(), 1);
}

#[test]
fn test_small_records_stay_plain() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);

    spool.append(&event("t", "d")).unwrap();
    let records = spool.iterate(None).unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].compressed);
}

#[test]
fn test_large_records_compress_and_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);

    let ev = event("big", &"payload ".repeat(500));
    spool.append(&ev).unwrap();

    let records = spool.iterate(None).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].compressed);
    assert_eq!(records[0].record.description, ev.description);
}

#[test]
fn test_iterate_preserves_append_order() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);

    let mut ids = Vec::new();
    for i in 0..5 {
        let mut ev = event(&format!("event {i}"), "d");
        // Force distinct, increasing timestamps.
        ev.timestamp = chrono::Utc::now() + chrono::Duration::milliseconds(i);
        ids.push(spool.append(&ev).unwrap());
    }

    let read: Vec<String> = spool
        .iterate(None)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(read, ids);
}

#[test]
fn test_ack_advances_cursor_for_replay() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);

    let mut first = event("one", "d");
    first.timestamp = chrono::Utc::now();
    let mut second = event("two", "d");
    second.timestamp = first.timestamp + chrono::Duration::milliseconds(5);

    spool.append(&first).unwrap();
    spool.append(&second).unwrap();

    spool.ack(&first.id).unwrap();

    // Replay after "restart": only the unacked record comes back.
    let replayed = spool.replay().unwrap();
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].id, second.id);
}

#[test]
fn test_cursor_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events");

    let mut first = event("one", "d");
    first.timestamp = chrono::Utc::now();
    let mut second = event("two", "d");
    second.timestamp = first.timestamp + chrono::Duration::milliseconds(5);

    {
        let spool: Spool<Event> = Spool::open(&path, options()).unwrap();
        spool.append(&first).unwrap();
        spool.append(&second).unwrap();
        spool.ack(&first.id).unwrap();
    }

    let reopened: Spool<Event> = Spool::open(&path, options()).unwrap();
    let replayed = reopened.replay().unwrap();
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].id, second.id);
}

#[test]
fn test_ack_unknown_id_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);
    let err = spool.ack("missing").unwrap_err();
    assert!(matches!(err, SpoolError::NotFound { .. }));
}

#[test]
fn test_prune_by_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);

    let mut old = event("old", "d");
    old.timestamp = chrono::Utc::now() - chrono::Duration::hours(2);
    let fresh = event("fresh", "d");

    spool.append(&old).unwrap();
    spool.append(&fresh).unwrap();

    let removed = spool.prune(Duration::from_secs(3600)).unwrap();
    assert_eq!(removed, 1);

    let remaining = spool.iterate(None).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, fresh.id);
}

#[test]
fn test_prune_enforces_count_cap() {
    let dir = tempfile::tempdir().unwrap();
    let spool: Spool<Event> = Spool::open(
        dir.path().join("events"),
        SpoolOptions {
            max_records: 3,
            ..options()
        },
    )
    .unwrap();

    for i in 0..6 {
        let mut ev = event(&format!("e{i}"), "d");
        ev.timestamp = chrono::Utc::now() + chrono::Duration::milliseconds(i);
        spool.append(&ev).unwrap();
    }

    let removed = spool.prune(Duration::from_secs(3600)).unwrap();
    assert_eq!(removed, 3);
    assert_eq!(spool.len().unwrap(), 3);
}

#[test]
fn test_corrupted_compressed_record_fails_integrity() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);

    let ev = event("big", &"payload ".repeat(500));
    spool.append(&ev).unwrap();

    // Corrupt the stored bytes past the gzip header.
    let file = std::fs::read_dir(spool.dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().ends_with(".json.gz"))
        .unwrap();
    let mut bytes = std::fs::read(file.path()).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x11;
    std::fs::write(file.path(), &bytes).unwrap();

    let err = spool.iterate(None).unwrap_err();
    assert!(matches!(
        err,
        SpoolError::Integrity { .. } | SpoolError::Malformed { .. }
    ));
}

#[test]
fn test_append_batch() {
    let dir = tempfile::tempdir().unwrap();
    let spool = open_spool(&dir);

    let events: Vec<Event> = (0..3).map(|i| event(&format!("e{i}"), "d")).collect();
    let ids = spool.append_batch(&events).unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(spool.len().unwrap(), 3);
}
