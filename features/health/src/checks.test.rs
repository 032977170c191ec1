#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;
use crate::check::HealthCheck as _;

#[tokio::test]
async fn test_port_check_unreachable() {
    // Port 1 is essentially never listening.
    let check = PortCheck::new("webhook_port", "127.0.0.1:1");
    let report = check.run().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_port_check_reachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let check = PortCheck::new("webhook_port", addr);
    let report = check.run().await;
    assert_eq!(report.status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_probe_check() {
    let up = ProbeCheck::new(
        "worker_alive",
        HealthLevel::Service,
        Arc::new(|| true),
        HealthStatus::Unhealthy,
    );
    assert_eq!(up.run().await.status, HealthStatus::Healthy);

    let down = ProbeCheck::new(
        "worker_alive",
        HealthLevel::Service,
        Arc::new(|| false),
        HealthStatus::Unhealthy,
    );
    assert_eq!(down.run().await.status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_baseline_check_tiers() {
    let make = |value: f64| {
        BaselineCheck::new("heap_mb", Arc::new(move || value), 40.0, 50.0)
    };
    assert_eq!(make(10.0).run().await.status, HealthStatus::Healthy);
    assert_eq!(make(45.0).run().await.status, HealthStatus::Degraded);
    assert_eq!(make(60.0).run().await.status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_spool_integrity_missing_dir() {
    let check = SpoolIntegrityCheck::new("/nonexistent/spool/dir");
    let report = check.run().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_spool_integrity_healthy_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("0001-a.json"), br#"{"id":"a"}"#).unwrap();

    let check = SpoolIntegrityCheck::new(dir.path());
    let report = check.run().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.details["malformed"], serde_json::json!(0));
}

#[tokio::test]
async fn test_spool_integrity_flags_malformed_records() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("0001-a.json"), b"{broken").unwrap();

    let check = SpoolIntegrityCheck::new(dir.path());
    let report = check.run().await;
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.details["malformed"], serde_json::json!(1));
}
