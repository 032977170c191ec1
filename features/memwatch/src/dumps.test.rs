#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

fn config(dir: &std::path::Path, max: usize, enabled: bool) -> HeapDumpConfig {
    HeapDumpConfig {
        enabled,
        dir: dir.to_path_buf(),
        max,
    }
}

#[test]
fn test_disabled_writer_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let writer = HeapDumpWriter::new(config(dir.path(), 3, false));
    assert!(writer.write(MemoryArea::Global, "test").is_err());
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[test]
fn test_write_creates_dump() {
    let dir = tempfile::tempdir().unwrap();
    let writer = HeapDumpWriter::new(config(dir.path(), 3, true));

    let path = writer.write(MemoryArea::EventFiles, "file accumulation").unwrap();
    assert!(path.exists());

    let body: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(body["area"], "event_files");
    assert_eq!(body["reason"], "file accumulation");
}

#[test]
fn test_retention_keeps_newest() {
    let dir = tempfile::tempdir().unwrap();
    let writer = HeapDumpWriter::new(config(dir.path(), 2, true));

    let mut paths = Vec::new();
    for _ in 0..4 {
        paths.push(writer.write(MemoryArea::Global, "r").unwrap());
        // Distinct timestamps in the file names.
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    let remaining: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(remaining.len(), 2);
    // The two newest survive.
    assert!(paths[3].exists());
    assert!(paths[2].exists());
    assert!(!paths[0].exists());
}
