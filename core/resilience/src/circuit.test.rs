use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;

fn config() -> CircuitConfig {
    CircuitConfig {
        failure_threshold: 3,
        window: Duration::from_secs(60),
        cool_down: Duration::from_millis(50),
        max_cool_down: Duration::from_secs(10),
        half_open_probes: 1,
    }
}

#[test]
fn test_starts_closed() {
    let circuit = CircuitBreaker::new("op", config());
    assert_eq!(circuit.state(), CircuitState::Closed);
    assert_eq!(circuit.admit(), Admission::Allowed);
}

#[test]
fn test_opens_after_threshold_failures() {
    let circuit = CircuitBreaker::new("op", config());
    circuit.record_failure();
    circuit.record_failure();
    assert_eq!(circuit.state(), CircuitState::Closed);

    circuit.record_failure();
    assert_eq!(circuit.state(), CircuitState::Open);
    assert!(matches!(circuit.admit(), Admission::Rejected { .. }));
}

#[test]
fn test_success_resets_failure_window() {
    let circuit = CircuitBreaker::new("op", config());
    circuit.record_failure();
    circuit.record_failure();
    circuit.record_success();
    circuit.record_failure();
    circuit.record_failure();
    // Only two failures since the success; still closed.
    assert_eq!(circuit.state(), CircuitState::Closed);
}

#[test]
fn test_half_open_after_cool_down_then_close_on_success() {
    let circuit = CircuitBreaker::new("op", config());
    for _ in 0..3 {
        circuit.record_failure();
    }
    assert_eq!(circuit.state(), CircuitState::Open);

    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(circuit.admit(), Admission::Probe);
    assert_eq!(circuit.state(), CircuitState::HalfOpen);

    circuit.record_success();
    assert_eq!(circuit.state(), CircuitState::Closed);
}

#[test]
fn test_failed_probe_doubles_cool_down() {
    let circuit = CircuitBreaker::new("op", config());
    for _ in 0..3 {
        circuit.record_failure();
    }

    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(circuit.admit(), Admission::Probe);
    circuit.record_failure();
    assert_eq!(circuit.state(), CircuitState::Open);

    // First cool-down was 50ms; the reopened circuit holds for ~100ms.
    std::thread::sleep(Duration::from_millis(60));
    assert!(matches!(circuit.admit(), Admission::Rejected { .. }));
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(circuit.admit(), Admission::Probe);
}

#[test]
fn test_only_one_probe_admitted() {
    let circuit = CircuitBreaker::new("op", config());
    for _ in 0..3 {
        circuit.record_failure();
    }
    std::thread::sleep(Duration::from_millis(60));

    assert_eq!(circuit.admit(), Admission::Probe);
    assert!(matches!(circuit.admit(), Admission::Rejected { .. }));
}

#[test]
fn test_force_open() {
    let circuit = CircuitBreaker::new("op", config());
    circuit.force_open(Duration::from_secs(30));
    assert_eq!(circuit.state(), CircuitState::Open);
    assert!(matches!(circuit.admit(), Admission::Rejected { .. }));
}

#[test]
fn test_map_reuses_instances() {
    let map = CircuitMap::new(config());
    let a = map.get("chat_send");
    let b = map.get("chat_send");
    a.record_failure();
    assert_eq!(b.snapshot().failure_count, 1);
    assert_eq!(map.snapshots().len(), 1);
}

#[test]
fn test_snapshot_fields() {
    let map = CircuitMap::new(config());
    let c = map.get("spool_write");
    c.record_success();
    let snap = c.snapshot();
    assert_eq!(snap.key, "spool_write");
    assert_eq!(snap.state, CircuitState::Closed);
    assert_eq!(snap.success_count, 1);
    assert_eq!(snap.failure_threshold, 3);
}
