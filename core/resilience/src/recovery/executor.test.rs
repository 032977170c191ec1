#![allow(clippy::unwrap_used)]

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use coderelay_config::CircuitConfig;
use coderelay_error::ErrorContext;
use coderelay_error::RecoveryStrategy;
use coderelay_error::StatusCode;
use pretty_assertions::assert_eq;

use super::*;
use crate::circuit::CircuitMap;
use crate::circuit::CircuitState;
use crate::recovery::handlers::EscalationNotifier;
use crate::recovery::plan::PlanCondition;
use crate::recovery::plan::PlanPriority;
use crate::recovery::plan::StepAction;
use crate::recovery::plan::StepState;

fn backoff() -> BackoffPolicy {
    BackoffPolicy::new(
        std::time::Duration::from_millis(1),
        2.0,
        std::time::Duration::from_millis(5),
        0.0,
    )
}

fn bridge_record() -> ErrorRecord {
    ErrorRecord::new(
        StatusCode::BridgeNotRunning,
        "worker exited",
        ErrorContext::new("chat_send", "bridge"),
    )
}

struct CountingNotifier(AtomicU32);

#[async_trait]
impl EscalationNotifier for CountingNotifier {
    async fn notify(&self, _record: &ErrorRecord) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn orchestrator_with(
    plans: Vec<RecoveryPlan>,
    registry: HandlerRegistry,
    max_concurrent: usize,
) -> RecoveryOrchestrator {
    RecoveryOrchestrator::new(
        plans,
        registry,
        backoff(),
        Arc::new(Classifier::with_defaults()),
        max_concurrent,
        std::time::Duration::from_secs(30),
    )
}

#[tokio::test]
async fn test_bridge_restart_plan_escalates_when_all_fails() {
    // Worker exits on every start attempt: retry x2 fails (retry only
    // signals), restart x3 fails, escalate fires once.
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let notifier = Arc::new(CountingNotifier(AtomicU32::new(0)));
    let restart_calls = Arc::new(AtomicU32::new(0));
    let restart_in = restart_calls.clone();

    let registry = HandlerRegistry::new(circuits.clone(), std::time::Duration::from_secs(5))
        .with_escalation(vec![notifier.clone()])
        .with_restart(Arc::new(move |_record| {
            let calls = restart_in.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("worker exited immediately".to_string())
            })
        }));

    let orchestrator = orchestrator_with(crate::recovery::default_plans(), registry, 4);

    let mut record = bridge_record();
    let report = orchestrator.execute(&mut record).await;

    assert_eq!(report.plan_id.as_deref(), Some("bridge_restart"));
    assert_eq!(report.status, ExecutionStatus::Escalated);
    assert_eq!(restart_calls.load(Ordering::SeqCst), 3);
    assert_eq!(notifier.0.load(Ordering::SeqCst), 1);

    // Steps in declared order: retry failed, restart failed, escalate.
    let states: Vec<StepState> = report.steps.iter().map(|s| s.state).collect();
    assert_eq!(
        states,
        vec![StepState::Failed, StepState::Failed, StepState::Failed]
    );
    assert_eq!(report.steps[0].attempts, 2);
    assert_eq!(report.steps[1].attempts, 3);
    assert_eq!(report.steps[2].attempts, 1);

    // Every attempt landed in the record's history.
    assert_eq!(record.history.len(), 6);
}

#[tokio::test]
async fn test_restart_success_completes_and_short_circuits() {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let notifier = Arc::new(CountingNotifier(AtomicU32::new(0)));

    let registry = HandlerRegistry::new(circuits, std::time::Duration::from_secs(5))
        .with_escalation(vec![notifier.clone()])
        .with_restart(Arc::new(|_record| Box::pin(async { Ok(()) })));

    let orchestrator = orchestrator_with(crate::recovery::default_plans(), registry, 4);

    let mut record = bridge_record();
    let report = orchestrator.execute(&mut record).await;

    assert_eq!(report.status, ExecutionStatus::Completed);
    // Escalate never ran.
    assert_eq!(report.steps.len(), 2);
    assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_plan_matches() {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let registry = HandlerRegistry::new(circuits, std::time::Duration::from_secs(5));
    let orchestrator = orchestrator_with(Vec::new(), registry, 4);

    let mut record = bridge_record();
    let report = orchestrator.execute(&mut record).await;
    assert_eq!(report.status, ExecutionStatus::NoPlan);
    assert!(report.steps.is_empty());
}

#[tokio::test]
async fn test_priority_then_specificity_tie_break() {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let registry = HandlerRegistry::new(circuits, std::time::Duration::from_secs(5));

    let broad = RecoveryPlan::new("broad", PlanPriority::Normal)
        .when(PlanCondition::Category(coderelay_error::ErrorCategory::Bridge))
        .step(
            crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Ignore)
                .on_success(StepAction::Complete),
        );
    let narrow = RecoveryPlan::new("narrow", PlanPriority::Normal)
        .when(PlanCondition::Category(coderelay_error::ErrorCategory::Bridge))
        .when(PlanCondition::Code(StatusCode::BridgeNotRunning))
        .step(
            crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Ignore)
                .on_success(StepAction::Complete),
        );
    let critical = RecoveryPlan::new("critical", PlanPriority::Critical)
        .when(PlanCondition::Retryable(true))
        .step(
            crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Ignore)
                .on_success(StepAction::Complete),
        );

    let orchestrator = orchestrator_with(vec![broad, narrow, critical], registry, 4);

    // Retryable=false for BridgeNotRunning, so "critical" does not match;
    // between broad and narrow, specificity picks narrow.
    let mut record = bridge_record();
    let report = orchestrator.execute(&mut record).await;
    assert_eq!(report.plan_id.as_deref(), Some("narrow"));
}

#[tokio::test]
async fn test_condition_skips_step_without_mutation() {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let registry = HandlerRegistry::new(circuits, std::time::Duration::from_secs(5));

    let plan = RecoveryPlan::new("gated", PlanPriority::Normal)
        .when(PlanCondition::Category(coderelay_error::ErrorCategory::Bridge))
        .step(
            crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Manual)
                .with_condition(PlanCondition::Component("webhook".to_string())),
        )
        .step(
            crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Ignore)
                .on_success(StepAction::Complete),
        );

    let orchestrator = orchestrator_with(vec![plan], registry, 4);

    let mut record = bridge_record();
    let report = orchestrator.execute(&mut record).await;

    assert_eq!(report.status, ExecutionStatus::Completed);
    assert_eq!(report.steps[0].state, StepState::Skipped);
    assert_eq!(report.steps[0].attempts, 0);
    // The skipped step recorded nothing into history.
    assert_eq!(record.history.len(), 1);
}

#[tokio::test]
async fn test_concurrency_cap_rejects_without_blocking() {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));

    // A restart action that parks until released.
    let (release_tx, release_rx) = tokio::sync::watch::channel(false);
    let registry = HandlerRegistry::new(circuits, std::time::Duration::from_secs(5))
        .with_restart(Arc::new(move |_record| {
            let mut release = release_rx.clone();
            Box::pin(async move {
                while !*release.borrow_and_update() {
                    if release.changed().await.is_err() {
                        break;
                    }
                }
                Ok(())
            })
        }));

    let plan = RecoveryPlan::new("slow", PlanPriority::Normal)
        .when(PlanCondition::Category(coderelay_error::ErrorCategory::Bridge))
        .step(
            crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Restart)
                .with_timeout(std::time::Duration::from_secs(10))
                .on_success(StepAction::Complete),
        );

    let orchestrator = Arc::new(orchestrator_with(vec![plan], registry, 1));

    let first = orchestrator.clone();
    let running = tokio::spawn(async move {
        let mut record = bridge_record();
        first.execute(&mut record).await
    });

    // Give the first execution time to occupy the slot.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(orchestrator.active_count(), 1);

    let mut record = bridge_record();
    let rejected = orchestrator.execute(&mut record).await;
    assert_eq!(rejected.status, ExecutionStatus::Rejected);
    assert_eq!(rejected.reason.as_deref(), Some("concurrent_limit"));

    release_tx.send(true).unwrap();
    let first_report = running.await.unwrap();
    assert_eq!(first_report.status, ExecutionStatus::Completed);
    assert_eq!(orchestrator.active_count(), 0);
}

#[tokio::test]
async fn test_plan_deadline_cancels_but_keeps_finished_steps() {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let registry = HandlerRegistry::new(circuits, std::time::Duration::from_secs(5))
        .with_restart(Arc::new(|_record| {
            Box::pin(async {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                Ok(())
            })
        }));

    // Step one finishes instantly; step two parks until the deadline.
    let plan = RecoveryPlan::new("stuck", PlanPriority::Normal)
        .when(PlanCondition::Category(coderelay_error::ErrorCategory::Bridge))
        .with_deadline(std::time::Duration::from_millis(100))
        .step(crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Ignore))
        .step(
            crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Restart)
                .with_timeout(std::time::Duration::from_secs(120)),
        );

    let classifier = Arc::new(Classifier::with_defaults());
    let orchestrator = RecoveryOrchestrator::new(
        vec![plan],
        registry,
        backoff(),
        classifier.clone(),
        4,
        std::time::Duration::from_secs(30),
    );

    let mut record = bridge_record();
    let report = orchestrator.execute(&mut record).await;
    assert_eq!(report.status, ExecutionStatus::Cancelled);

    // The completed step survives cancellation; the interrupted step is
    // reported as failed with the deadline detail.
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].strategy, RecoveryStrategy::Ignore);
    assert_eq!(report.steps[0].state, StepState::Completed);
    assert_eq!(report.steps[1].strategy, RecoveryStrategy::Restart);
    assert_eq!(report.steps[1].state, StepState::Failed);
    assert_eq!(
        report.steps[1].detail.as_deref(),
        Some("cancelled at plan deadline")
    );

    // Both steps landed in the record history: the ignore attempt plus
    // the best-effort entry for the interrupted restart.
    assert_eq!(record.history.len(), 2);
    assert_eq!(record.history[1].strategy, RecoveryStrategy::Restart);
    assert!(!record.history[1].succeeded);

    // The interrupted step still fed the strategy statistics.
    let stats = classifier.stats();
    assert!(stats.strategy_rates.contains_key(&RecoveryStrategy::Restart));
    assert!(stats.strategy_rates.contains_key(&RecoveryStrategy::Ignore));
}

#[tokio::test]
async fn test_effectiveness_counters() {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let registry = HandlerRegistry::new(circuits, std::time::Duration::from_secs(5));

    let plan = RecoveryPlan::new("quick", PlanPriority::Normal)
        .when(PlanCondition::Category(coderelay_error::ErrorCategory::Bridge))
        .step(
            crate::recovery::plan::RecoveryStep::new(RecoveryStrategy::Ignore)
                .on_success(StepAction::Complete),
        );

    let orchestrator = orchestrator_with(vec![plan], registry, 4);

    let mut record = bridge_record();
    orchestrator.execute(&mut record).await;
    orchestrator.execute(&mut record).await;

    let eff = orchestrator.effectiveness();
    assert_eq!(eff.get("quick").map(|e| e.executions), Some(2));
    assert_eq!(eff.get("quick").map(|e| e.completed), Some(2));
}
