#![allow(clippy::unwrap_used)]

use std::time::Duration;

use coderelay_bridge::BridgeSupervisor;
use coderelay_config::BridgeConfig;
use coderelay_config::CircuitConfig;
use coderelay_config::LimitsConfig;
use coderelay_config::RateLimitConfig;
use coderelay_dispatch::DispatchPipeline;
use coderelay_resilience::BackoffPolicy;
use coderelay_resilience::CircuitMap;
use coderelay_resilience::classify::Classifier;
use coderelay_resilience::recovery::HandlerRegistry;
use coderelay_resilience::recovery::RecoveryOrchestrator;
use coderelay_resilience::recovery::default_plans;
use coderelay_spool::SpoolOptions;
use coderelay_spool::SpoolSet;
use pretty_assertions::assert_eq;

use super::*;

fn context(dir: &tempfile::TempDir) -> Arc<ToolContext> {
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
    let dispatch = Arc::new(DispatchPipeline::new(
        spool,
        LimitsConfig::default(),
        &RateLimitConfig::default(),
        32,
    ));
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let supervisor = BridgeSupervisor::new(BridgeConfig::default(), circuits.get("bridge"));
    let classifier = Arc::new(Classifier::with_defaults());
    let orchestrator = Arc::new(RecoveryOrchestrator::new(
        default_plans(),
        HandlerRegistry::new(circuits, Duration::from_secs(30)),
        BackoffPolicy::new(
            Duration::from_millis(1),
            2.0,
            Duration::from_millis(5),
            0.0,
        ),
        classifier.clone(),
        4,
        Duration::from_secs(30),
    ));
    ToolContext::new(dispatch, supervisor, classifier, orchestrator)
}

#[test]
fn test_event_types_resource() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    let value = read_resource("event-types", &ctx).unwrap();
    assert!(value["event_types"].as_array().unwrap().len() >= 40);
}

#[test]
fn test_bridge_status_resource() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    let value = read_resource("bridge-status", &ctx).unwrap();
    assert_eq!(value["state"], "stopped");
}

#[test]
fn test_responses_resource() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    ctx.dispatch
        .accept_response(coderelay_protocol::Response::from_callback(
            "approve_t-1",
            7,
            chrono::Utc::now(),
        ))
        .unwrap();

    let value = read_resource("responses", &ctx).unwrap();
    assert_eq!(value["responses"].as_array().unwrap().len(), 1);
}

#[test]
fn test_event_templates_resource() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    let value = read_resource("event-templates", &ctx).unwrap();
    assert!(value.get("approval_request").is_some());
    assert_eq!(value["approval_request"]["type"], "approval_request");
}

#[test]
fn test_unknown_resource() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir);
    assert!(read_resource("nope", &ctx).is_none());
    assert_eq!(RESOURCE_NAMES.len(), 4);
}
