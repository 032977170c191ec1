use coderelay_error::ErrorContext;
use pretty_assertions::assert_eq;

use super::*;

fn record(code: StatusCode) -> ErrorRecord {
    ErrorRecord::new(code, "boom", ErrorContext::new("chat_send", "bridge"))
}

#[test]
fn test_all_conditions_must_match() {
    let plan = RecoveryPlan::new("p", PlanPriority::Normal)
        .when(PlanCondition::Category(ErrorCategory::Bridge))
        .when(PlanCondition::Component("bridge".to_string()));

    assert!(plan.matches(&record(StatusCode::BridgeNotRunning)));
    assert!(!plan.matches(&record(StatusCode::NetworkError)));
}

#[test]
fn test_empty_predicate_never_matches() {
    let plan = RecoveryPlan::new("p", PlanPriority::Normal);
    assert!(!plan.matches(&record(StatusCode::BridgeNotRunning)));
}

#[test]
fn test_min_severity_condition() {
    let cond = PlanCondition::MinSeverity(Severity::High);
    // BridgeNotRunning defaults to high severity.
    assert!(cond.matches(&record(StatusCode::BridgeNotRunning)));
    // NetworkError defaults to low.
    assert!(!cond.matches(&record(StatusCode::NetworkError)));
}

#[test]
fn test_specificity_counts_conditions() {
    let narrow = RecoveryPlan::new("narrow", PlanPriority::Normal)
        .when(PlanCondition::Category(ErrorCategory::Bridge))
        .when(PlanCondition::Code(StatusCode::BridgeNotRunning));
    let broad = RecoveryPlan::new("broad", PlanPriority::Normal)
        .when(PlanCondition::Category(ErrorCategory::Bridge));

    assert!(narrow.specificity() > broad.specificity());
}

#[test]
fn test_priority_ordering() {
    assert!(PlanPriority::Critical > PlanPriority::High);
    assert!(PlanPriority::High > PlanPriority::Normal);
    assert!(PlanPriority::Normal > PlanPriority::Low);
}

#[test]
fn test_step_builder_defaults() {
    let step = RecoveryStep::new(RecoveryStrategy::Retry);
    assert_eq!(step.max_attempts, 1);
    assert_eq!(step.on_success, StepAction::Continue);
    assert_eq!(step.on_failure, StepAction::Continue);
    assert!(step.condition.is_none());
}

#[test]
fn test_max_attempts_floor() {
    let step = RecoveryStep::new(RecoveryStrategy::Retry).with_max_attempts(0);
    assert_eq!(step.max_attempts, 1);
}
