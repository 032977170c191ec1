#![allow(clippy::unwrap_used)]

use coderelay_config::CircuitConfig;
use coderelay_config::RestartBackoffConfig;
use coderelay_resilience::CircuitState;
use pretty_assertions::assert_eq;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::*;

fn circuit() -> Arc<CircuitBreaker> {
    Arc::new(CircuitBreaker::new("bridge", CircuitConfig::default()))
}

fn config(health_endpoint: String) -> BridgeConfig {
    BridgeConfig {
        command: "sleep".to_string(),
        args: vec!["30".to_string()],
        health_endpoint,
        startup_deadline_ms: 3_000,
        poll_interval_ms: 100,
        restart_backoff: RestartBackoffConfig {
            base_ms: 10,
            multiplier: 2.0,
            max_ms: 100,
            max_restarts: 5,
            window: Duration::from_secs(300),
        },
    }
}

async fn healthy_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_start_waits_for_ready() {
    let server = healthy_server().await;
    let supervisor = BridgeSupervisor::new(config(format!("{}/health", server.uri())), circuit());

    supervisor.start().await.unwrap();

    let status = supervisor.status();
    assert_eq!(status.state, WorkerState::Running);
    assert!(status.healthy);
    assert!(status.pid.is_some());

    supervisor.stop().await.unwrap();
    assert_eq!(supervisor.status().state, WorkerState::Stopped);
}

#[tokio::test]
async fn test_start_twice_is_already_running() {
    let server = healthy_server().await;
    let supervisor = BridgeSupervisor::new(config(format!("{}/health", server.uri())), circuit());

    supervisor.start().await.unwrap();
    let err = supervisor.start().await.unwrap_err();
    assert!(matches!(err, BridgeError::AlreadyRunning { .. }));

    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn test_ensure_running_is_idempotent() {
    let server = healthy_server().await;
    let supervisor = BridgeSupervisor::new(config(format!("{}/health", server.uri())), circuit());

    supervisor.ensure_running().await.unwrap();
    let pid = supervisor.status().pid;
    supervisor.ensure_running().await.unwrap();
    assert_eq!(supervisor.status().pid, pid);

    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn test_startup_timeout_kills_worker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut cfg = config(format!("{}/health", server.uri()));
    cfg.startup_deadline_ms = 300;
    let supervisor = BridgeSupervisor::new(cfg, circuit());

    let err = supervisor.start().await.unwrap_err();
    assert!(matches!(err, BridgeError::StartupTimeout { .. }));
    assert_eq!(supervisor.status().state, WorkerState::Failed);
    assert!(!supervisor.check_process().await);
}

#[tokio::test]
async fn test_worker_exiting_during_startup_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    // `true` exits immediately; ready can never be reached.
    let mut cfg = config(format!("{}/health", server.uri()));
    cfg.command = "true".to_string();
    cfg.args = Vec::new();
    cfg.startup_deadline_ms = 2_000;
    let supervisor = BridgeSupervisor::new(cfg, circuit());

    let err = supervisor.start().await.unwrap_err();
    assert!(matches!(err, BridgeError::StartupTimeout { .. }));
}

#[tokio::test]
async fn test_stop_without_worker() {
    let supervisor = BridgeSupervisor::new(config("http://127.0.0.1:1/health".to_string()), circuit());
    let err = supervisor.stop().await.unwrap_err();
    assert!(matches!(err, BridgeError::NotRunning { .. }));
}

#[tokio::test]
async fn test_restart_storm_trips_circuit() {
    let breaker = circuit();
    let mut cfg = config("http://127.0.0.1:1/health".to_string());
    cfg.restart_backoff.max_restarts = 0;
    let supervisor = BridgeSupervisor::new(cfg, breaker.clone());

    let err = supervisor.restart().await.unwrap_err();
    assert!(matches!(err, BridgeError::CircuitTripped { .. }));
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn test_poll_loop_detects_crash() {
    let server = healthy_server().await;
    let supervisor = BridgeSupervisor::new(config(format!("{}/health", server.uri())), circuit());

    supervisor.start().await.unwrap();
    let poll = tokio::spawn(supervisor.clone().run_poll_loop());

    // Kill the worker out from under the supervisor.
    supervisor.stop().await.unwrap();
    // Manually flip state back so the loop can observe the "crash".
    supervisor.status_tx.send_modify(|s| s.state = WorkerState::Running);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(supervisor.status().state, WorkerState::Failed);

    supervisor.shutdown();
    poll.await.unwrap();
}
