#![allow(clippy::unwrap_used)]

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use pretty_assertions::assert_eq;

use super::*;

/// Source whose readings the test scripts.
struct FakeSource {
    heap: AtomicU64,
}

impl FakeSource {
    fn new(heap_mb: u64) -> Arc<Self> {
        Arc::new(Self {
            heap: AtomicU64::new(heap_mb * 1024 * 1024),
        })
    }

    fn set_mb(&self, heap_mb: u64) {
        self.heap.store(heap_mb * 1024 * 1024, Ordering::SeqCst);
    }
}

impl MemorySource for FakeSource {
    fn read(&self) -> MemoryReading {
        let heap = self.heap.load(Ordering::SeqCst);
        MemoryReading {
            heap_bytes: heap,
            resident_bytes: heap,
        }
    }
}

fn config() -> MemoryConfig {
    MemoryConfig {
        max_heap_mb: 50,
        growth_mb_per_min: 10_000.0,
        snapshot_ms: 100,
        alert_cooldown: Duration::from_secs(300),
        max_spool_files: 100,
    }
}

#[test]
fn test_snapshot_covers_every_area() {
    let source = FakeSource::new(10);
    let monitor = MemoryMonitor::new(config(), source);
    let snapshots = monitor.snapshot_all();
    assert_eq!(snapshots.len(), 6);
    assert!(snapshots.iter().any(|s| s.area == MemoryArea::SecurityConfig));
}

#[test]
fn test_probe_counts_in_snapshots() {
    let source = FakeSource::new(10);
    let monitor = MemoryMonitor::new(config(), source)
        .with_probe(MemoryArea::EventFiles, Arc::new(|| 42));

    let snapshots = monitor.snapshot_all();
    let files = snapshots
        .iter()
        .find(|s| s.area == MemoryArea::EventFiles)
        .unwrap();
    assert_eq!(files.count, Some(42));
}

#[test]
fn test_heap_breach_emits_once_within_cooldown() {
    let source = FakeSource::new(10);
    let monitor = MemoryMonitor::new(config(), source.clone());
    let mut cleanups = monitor.cleanup_requests();

    // Under the cap: nothing fires.
    assert!(monitor.tick().is_empty());

    // Climb past the 50 MiB cap.
    source.set_mb(80);
    let alerts = monitor.tick();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::ThresholdBreach);
    assert_eq!(alerts[0].area, MemoryArea::Global);
    assert_eq!(alerts[0].severity, coderelay_error::Severity::Critical);
    assert!(!alerts[0].recommended_actions.is_empty());

    // A cleanup request was signalled, not performed.
    let cleanup = cleanups.try_recv().unwrap();
    assert_eq!(cleanup.area, MemoryArea::Global);

    // Second breach within the cooldown is suppressed.
    source.set_mb(90);
    assert!(monitor.tick().is_empty());
}

#[test]
fn test_cooldown_is_per_kind_and_area() {
    let source = FakeSource::new(80);
    let monitor = MemoryMonitor::new(config(), source)
        .with_probe(MemoryArea::EventFiles, Arc::new(|| 500));

    let alerts = monitor.tick();
    // Heap breach and file accumulation are distinct (kind, area) pairs.
    let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
    assert!(kinds.contains(&AlertKind::ThresholdBreach));
    assert!(kinds.contains(&AlertKind::FileAccumulation));
}

#[test]
fn test_file_accumulation_alert() {
    let source = FakeSource::new(10);
    let monitor = MemoryMonitor::new(config(), source)
        .with_probe(MemoryArea::EventFiles, Arc::new(|| 1_000));

    let alerts = monitor.tick();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::FileAccumulation);
    assert_eq!(alerts[0].area, MemoryArea::EventFiles);
}

#[test]
fn test_heap_dump_written_on_breach() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::new(80);
    let monitor = MemoryMonitor::new(config(), source).with_heap_dumps(HeapDumpWriter::new(
        coderelay_config::HeapDumpConfig {
            enabled: true,
            dir: dir.path().to_path_buf(),
            max: 3,
        },
    ));

    let alerts = monitor.tick();
    let dump = alerts[0].heap_dump.as_ref().unwrap();
    assert!(std::path::Path::new(dump).exists());
}

#[tokio::test]
async fn test_alert_subscription() {
    let source = FakeSource::new(80);
    let monitor = Arc::new(MemoryMonitor::new(config(), source));
    let mut alerts = monitor.alerts();

    monitor.tick();

    let alert = alerts.recv().await.unwrap();
    assert_eq!(alert.kind, AlertKind::ThresholdBreach);
}

#[test]
fn test_growth_rate_alert() {
    let source = FakeSource::new(10);
    let mut cfg = config();
    cfg.growth_mb_per_min = 5.0;
    let monitor = MemoryMonitor::new(cfg, source.clone());

    monitor.tick();
    std::thread::sleep(Duration::from_millis(1100));
    // +20 MiB in ~1s is far over 5 MiB/min.
    source.set_mb(30);
    let alerts = monitor.tick();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::GrowthRate);
}
