#![allow(clippy::unwrap_used)]

use coderelay_error::ErrorContext;
use coderelay_error::ErrorRecord;
use pretty_assertions::assert_eq;

use super::*;

fn record(code: StatusCode, component: &str) -> ErrorRecord {
    ErrorRecord::new(code, "boom", ErrorContext::new("op", component))
}

#[test]
fn test_bridge_errors_route_to_bridge_restart() {
    let plans = default_plans();
    let r = record(StatusCode::BridgeNotRunning, "bridge");
    let matched: Vec<&str> = plans
        .iter()
        .filter(|p| p.matches(&r))
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(matched, vec!["bridge_restart"]);
}

#[test]
fn test_rate_limit_routes_to_both_chat_plans() {
    let plans = default_plans();
    let r = record(StatusCode::ChatRateLimited, "dispatch");
    let mut matched: Vec<&str> = plans
        .iter()
        .filter(|p| p.matches(&r))
        .map(|p| p.id.as_str())
        .collect();
    matched.sort_unstable();
    assert_eq!(matched, vec!["chat_rate_limit", "chat_unreachable"]);
}

#[test]
fn test_integrity_routes_to_spool_degraded() {
    let plans = default_plans();
    let r = record(StatusCode::IntegrityError, "spool");
    assert!(
        plans
            .iter()
            .any(|p| p.id == "spool_degraded" && p.matches(&r))
    );
}

#[test]
fn test_bridge_restart_shape() {
    let plans = default_plans();
    let plan = plans.iter().find(|p| p.id == "bridge_restart").unwrap();

    let strategies: Vec<RecoveryStrategy> = plan.steps.iter().map(|s| s.strategy).collect();
    assert_eq!(
        strategies,
        vec![
            RecoveryStrategy::Retry,
            RecoveryStrategy::Restart,
            RecoveryStrategy::Escalate
        ]
    );
    assert_eq!(plan.steps[0].max_attempts, 2);
    assert_eq!(plan.steps[1].max_attempts, 3);
    assert_eq!(plan.steps[1].on_failure, StepAction::Escalate);
}
