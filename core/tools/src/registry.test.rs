#![allow(clippy::unwrap_used)]

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use coderelay_bridge::BridgeSupervisor;
use coderelay_config::BridgeConfig;
use coderelay_config::CircuitConfig;
use coderelay_config::LimitsConfig;
use coderelay_config::RateLimitConfig;
use coderelay_config::RestartBackoffConfig;
use coderelay_dispatch::DispatchPipeline;
use coderelay_error::ErrorRecord;
use coderelay_resilience::BackoffPolicy;
use coderelay_resilience::CircuitMap;
use coderelay_resilience::CircuitState;
use coderelay_resilience::classify::Classifier;
use coderelay_resilience::recovery::EscalationNotifier;
use coderelay_resilience::recovery::HandlerRegistry;
use coderelay_resilience::recovery::RecoveryOrchestrator;
use coderelay_resilience::recovery::default_plans;
use coderelay_spool::SpoolOptions;
use coderelay_spool::SpoolSet;
use pretty_assertions::assert_eq;

use super::*;

fn test_dispatch(dir: &tempfile::TempDir) -> Arc<DispatchPipeline> {
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
    Arc::new(DispatchPipeline::new(
        spool,
        LimitsConfig::default(),
        &RateLimitConfig::default(),
        32,
    ))
}

fn test_backoff() -> BackoffPolicy {
    BackoffPolicy::new(
        Duration::from_millis(1),
        2.0,
        Duration::from_millis(5),
        0.0,
    )
}

fn context(dir: &tempfile::TempDir) -> Arc<ToolContext> {
    let dispatch = test_dispatch(dir);
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let supervisor = BridgeSupervisor::new(BridgeConfig::default(), circuits.get("bridge"));
    let classifier = Arc::new(Classifier::with_defaults());
    let orchestrator = Arc::new(RecoveryOrchestrator::new(
        default_plans(),
        HandlerRegistry::new(circuits, Duration::from_secs(30)),
        test_backoff(),
        classifier.clone(),
        4,
        Duration::from_secs(30),
    ));
    ToolContext::new(dispatch, supervisor, classifier, orchestrator)
}

#[test]
fn test_list_exposes_every_operation() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::with_builtins(context(&dir));

    let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
    for expected in [
        "send_event",
        "send_message",
        "send_task_completion",
        "send_performance_alert",
        "send_approval_request",
        "get_responses",
        "process_pending_responses",
        "clear_old_responses",
        "get_bridge_status",
        "start_bridge",
        "stop_bridge",
        "restart_bridge",
        "ensure_bridge_running",
        "check_bridge_process",
        "list_event_types",
        "get_task_status",
        "todo",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
    assert_eq!(names.len(), 17);
}

#[tokio::test]
async fn test_send_event_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::with_builtins(context(&dir));

    let reply = registry
        .invoke(
            "send_event",
            serde_json::json!({
                "type": "task_completion",
                "title": "Done",
                "description": "All tests green",
                "task_id": "t-1"
            }),
        )
        .await;

    assert_eq!(reply["success"], true);
    assert!(reply["event_id"].as_str().is_some());
}

#[tokio::test]
async fn test_oversize_event_is_validation_failed() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    let registry = ToolRegistry::with_builtins(ctx.clone());

    let reply = registry
        .invoke(
            "send_event",
            serde_json::json!({
                "type": "info_notification",
                "title": "big",
                "description": "d".repeat(100_000),
            }),
        )
        .await;

    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"]["code"], "VALIDATION_FAILED");
    // No spool entry was written.
    assert_eq!(ctx.dispatch.spool().events().len().unwrap(), 0);
}

#[tokio::test]
async fn test_missing_required_field() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::with_builtins(context(&dir));

    let reply = registry
        .invoke("send_event", serde_json::json!({ "title": "no type" }))
        .await;

    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(reply["error"]["metadata"]["field"], "type");
}

#[tokio::test]
async fn test_unknown_tool() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::with_builtins(context(&dir));

    let reply = registry.invoke("fly_to_moon", serde_json::json!({})).await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_list_event_types_payload() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::with_builtins(context(&dir));

    let reply = registry.invoke("list_event_types", serde_json::json!({})).await;
    assert_eq!(reply["success"], true);
    let types = reply["payload"]["event_types"].as_array().unwrap();
    assert!(types.len() >= 40);
    assert!(types.contains(&serde_json::json!("approval_request")));
}

#[tokio::test]
async fn test_response_round_trip_through_tools() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    let registry = ToolRegistry::with_builtins(ctx.clone());

    let response = coderelay_protocol::Response::from_callback(
        "approve_t-9",
        297126051,
        chrono::Utc::now(),
    );
    ctx.dispatch.accept_response(response).unwrap();

    let reply = registry
        .invoke("get_responses", serde_json::json!({ "limit": 5 }))
        .await;
    assert_eq!(reply["success"], true);
    let responses = reply["payload"]["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["task_id"], "t-9");

    let reply = registry
        .invoke("clear_old_responses", serde_json::json!({ "older_than_hours": 0 }))
        .await;
    assert_eq!(reply["success"], true);
}

#[tokio::test]
async fn test_get_task_status_reads_history() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    let registry = ToolRegistry::with_builtins(ctx.clone());

    registry
        .invoke(
            "send_task_completion",
            serde_json::json!({ "task_id": "t-77", "title": "Refactor done" }),
        )
        .await;

    let reply = registry
        .invoke("get_task_status", serde_json::json!({ "task_id": "t-77" }))
        .await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["payload"]["latest"]["type"], "task_completion");
    assert_eq!(reply["payload"]["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_todo_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::with_builtins(context(&dir));

    let added = registry
        .invoke("todo", serde_json::json!({ "action": "add", "text": "ship it" }))
        .await;
    assert_eq!(added["success"], true);
    let id = added["payload"]["item"]["id"].as_str().unwrap().to_string();

    let listed = registry.invoke("todo", serde_json::json!({ "action": "list" })).await;
    assert_eq!(listed["payload"]["items"].as_array().unwrap().len(), 1);

    let done = registry
        .invoke("todo", serde_json::json!({ "action": "done", "id": id }))
        .await;
    assert_eq!(done["success"], true);

    let bad = registry
        .invoke("todo", serde_json::json!({ "action": "done", "id": "nope" }))
        .await;
    assert_eq!(bad["success"], false);
}

#[tokio::test]
async fn test_check_bridge_process_without_worker() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::with_builtins(context(&dir));

    let reply = registry
        .invoke("check_bridge_process", serde_json::json!({}))
        .await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["payload"]["running"], false);
}

#[tokio::test]
async fn test_stop_bridge_without_worker_is_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::with_builtins(context(&dir));

    let reply = registry.invoke("stop_bridge", serde_json::json!({})).await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"]["code"], "BRIDGE_NOT_RUNNING");
}

#[derive(Default)]
struct CountingNotifier(AtomicU32);

#[async_trait]
impl EscalationNotifier for CountingNotifier {
    async fn notify(&self, _record: &ErrorRecord) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A worker that exits on every start.
fn crashlooping_supervisor(
    circuits: &Arc<CircuitMap>,
    max_restarts: u32,
) -> Arc<BridgeSupervisor> {
    BridgeSupervisor::new(
        BridgeConfig {
            command: "true".to_string(),
            args: Vec::new(),
            health_endpoint: "http://127.0.0.1:1/health".to_string(),
            startup_deadline_ms: 200,
            poll_interval_ms: 100,
            restart_backoff: RestartBackoffConfig {
                base_ms: 5,
                multiplier: 2.0,
                max_ms: 20,
                max_restarts,
                window: Duration::from_secs(300),
            },
        },
        circuits.get("bridge"),
    )
}

#[tokio::test]
async fn test_send_event_drives_recovery_and_surfaces_bridge_not_running() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = test_dispatch(&dir);

    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let bridge_circuit = circuits.get("bridge");
    // Two restarts allowed in window; the plan's third attempt trips the
    // bridge circuit.
    let supervisor = crashlooping_supervisor(&circuits, 2);

    // The worker dies during startup, leaving the supervisor in Failed.
    assert!(supervisor.start().await.is_err());

    let notifier = Arc::new(CountingNotifier::default());
    let restart_supervisor = supervisor.clone();
    let handlers = HandlerRegistry::new(circuits.clone(), Duration::from_secs(5))
        .with_escalation(vec![notifier.clone()])
        .with_restart(Arc::new(move |_record| {
            let supervisor = restart_supervisor.clone();
            Box::pin(async move { supervisor.restart().await.map_err(|e| e.to_string()) })
        }));
    let classifier = Arc::new(Classifier::with_defaults());
    let orchestrator = Arc::new(RecoveryOrchestrator::new(
        default_plans(),
        handlers,
        test_backoff(),
        classifier.clone(),
        4,
        Duration::from_secs(60),
    ));

    let ctx = ToolContext::new(dispatch, supervisor, classifier, orchestrator);
    let registry = ToolRegistry::with_builtins(ctx.clone());

    let reply = registry
        .invoke(
            "send_event",
            serde_json::json!({
                "type": "task_completion",
                "title": "Done",
                "description": "All tests green",
            }),
        )
        .await;

    // The recovery plan ran to its terminal state and the tool response
    // carries the bridge failure, not an accepted receipt.
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"]["code"], "BRIDGE_NOT_RUNNING");
    assert_eq!(reply["error"]["metadata"]["plan"], "bridge_restart");

    // Escalation fired exactly once, the restart storm tripped the
    // bridge circuit, and nothing was spooled.
    assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    assert_eq!(bridge_circuit.state(), CircuitState::Open);
    assert_eq!(ctx.dispatch.spool().events().len().unwrap(), 0);
}

#[tokio::test]
async fn test_send_event_fails_fast_when_bridge_circuit_open() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = test_dispatch(&dir);

    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let supervisor = crashlooping_supervisor(&circuits, 2);
    assert!(supervisor.start().await.is_err());
    supervisor.circuit().force_open(Duration::from_secs(60));

    let notifier = Arc::new(CountingNotifier::default());
    let classifier = Arc::new(Classifier::with_defaults());
    let orchestrator = Arc::new(RecoveryOrchestrator::new(
        default_plans(),
        HandlerRegistry::new(circuits, Duration::from_secs(5))
            .with_escalation(vec![notifier.clone()]),
        test_backoff(),
        classifier.clone(),
        4,
        Duration::from_secs(60),
    ));

    let ctx = ToolContext::new(dispatch, supervisor, classifier, orchestrator);
    let registry = ToolRegistry::with_builtins(ctx);

    let reply = registry
        .invoke(
            "send_event",
            serde_json::json!({
                "type": "info_notification",
                "title": "hi",
                "description": "still there?",
            }),
        )
        .await;

    // An open circuit short-circuits: no new recovery execution, no
    // escalation, just the typed failure.
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"]["code"], "BRIDGE_NOT_RUNNING");
    assert_eq!(reply["error"]["metadata"]["circuit"], "open");
    assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversize_event_skips_recovery_even_with_failed_worker() {
    let dir = tempfile::tempdir().unwrap();
    let dispatch = test_dispatch(&dir);

    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let supervisor = crashlooping_supervisor(&circuits, 2);
    assert!(supervisor.start().await.is_err());

    let notifier = Arc::new(CountingNotifier::default());
    let classifier = Arc::new(Classifier::with_defaults());
    let orchestrator = Arc::new(RecoveryOrchestrator::new(
        default_plans(),
        HandlerRegistry::new(circuits, Duration::from_secs(5))
            .with_escalation(vec![notifier.clone()]),
        test_backoff(),
        classifier.clone(),
        4,
        Duration::from_secs(60),
    ));

    let ctx = ToolContext::new(dispatch, supervisor, classifier, orchestrator);
    let registry = ToolRegistry::with_builtins(ctx);

    let reply = registry
        .invoke(
            "send_event",
            serde_json::json!({
                "type": "info_notification",
                "title": "big",
                "description": "d".repeat(100_000),
            }),
        )
        .await;

    // Validation wins over worker health: no recovery run, no retries.
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
}
