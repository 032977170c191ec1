//! The bounded recovery executor.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use coderelay_error::ErrorRecord;
use coderelay_error::RecoveryAttempt;
use coderelay_error::RecoveryStrategy;
use serde::Serialize;

use crate::backoff::BackoffPolicy;
use crate::classify::Classifier;
use crate::recovery::handlers::HandlerOutcome;
use crate::recovery::handlers::HandlerRegistry;
use crate::recovery::plan::RecoveryPlan;
use crate::recovery::plan::RecoveryStep;
use crate::recovery::plan::StepAction;
use crate::recovery::plan::StepReport;
use crate::recovery::plan::StepState;

/// Terminal state of one recovery execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// A step completed the plan.
    Completed,
    /// The plan ran out of steps without recovering.
    Failed,
    /// The incident was escalated to operators.
    Escalated,
    /// The overall deadline cancelled the execution.
    Cancelled,
    /// The concurrency cap rejected the request outright.
    Rejected,
    /// No plan predicate matched the error.
    NoPlan,
}

/// Full report of one execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Unique execution id.
    pub execution_id: String,
    /// The selected plan, when any matched.
    pub plan_id: Option<String>,
    /// Terminal status.
    pub status: ExecutionStatus,
    /// Rejection reason, when status is `Rejected`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Per-step reports in declared order.
    pub steps: Vec<StepReport>,
    /// When the execution started.
    pub started_at: DateTime<Utc>,
    /// When it finished.
    pub finished_at: DateTime<Utc>,
}

/// Per-plan effectiveness counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PlanEffectiveness {
    pub executions: u64,
    pub completed: u64,
}

struct ActiveExecutions {
    running: HashMap<String, String>,
    effectiveness: HashMap<String, PlanEffectiveness>,
}

/// Step state shared between an execution and its deadline watcher.
///
/// Reports land here as they are produced, so cancellation at the plan
/// deadline keeps everything the execution already did; `running`
/// describes the step in flight so the interrupted step still gets an
/// outcome recorded.
#[derive(Default)]
struct StepProgress {
    reports: Vec<StepReport>,
    running: Option<RunningStep>,
}

/// The step an execution is currently inside.
struct RunningStep {
    strategy: RecoveryStrategy,
    /// Attempt ordinal, 1-based.
    attempt: u32,
    /// Whether the current attempt already wrote its history entry
    /// (true while sleeping out the backoff before the next attempt).
    attempt_recorded: bool,
}

fn lock_progress(progress: &Arc<Mutex<StepProgress>>) -> std::sync::MutexGuard<'_, StepProgress> {
    progress.lock().unwrap_or_else(|e| e.into_inner())
}

/// Executes recovery plans with a bounded active set.
pub struct RecoveryOrchestrator {
    plans: Vec<RecoveryPlan>,
    handlers: HandlerRegistry,
    backoff: BackoffPolicy,
    classifier: Arc<Classifier>,
    max_concurrent: usize,
    default_deadline: Duration,
    active: Mutex<ActiveExecutions>,
}

impl RecoveryOrchestrator {
    /// Create an orchestrator over a plan registry.
    pub fn new(
        plans: Vec<RecoveryPlan>,
        handlers: HandlerRegistry,
        backoff: BackoffPolicy,
        classifier: Arc<Classifier>,
        max_concurrent: usize,
        default_deadline: Duration,
    ) -> Self {
        Self {
            plans,
            handlers,
            backoff,
            classifier,
            max_concurrent: max_concurrent.max(1),
            default_deadline,
            active: Mutex::new(ActiveExecutions {
                running: HashMap::new(),
                effectiveness: HashMap::new(),
            }),
        }
    }

    /// Number of executions currently running.
    pub fn active_count(&self) -> usize {
        self.lock().running.len()
    }

    /// Effectiveness counters per plan.
    pub fn effectiveness(&self) -> HashMap<String, PlanEffectiveness> {
        self.lock().effectiveness.clone()
    }

    /// Execute recovery for an error.
    ///
    /// Never blocks on the concurrency cap: at the cap, the request is
    /// rejected immediately with `reason = "concurrent_limit"`.
    pub async fn execute(&self, record: &mut ErrorRecord) -> ExecutionReport {
        let execution_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let Some(plan) = self.select_plan(record) else {
            return ExecutionReport {
                execution_id,
                plan_id: None,
                status: ExecutionStatus::NoPlan,
                reason: None,
                steps: Vec::new(),
                started_at,
                finished_at: Utc::now(),
            };
        };

        // Admission under the cap, atomically with registration.
        {
            let mut active = self.lock();
            if active.running.len() >= self.max_concurrent {
                tracing::warn!(
                    plan = %plan.id,
                    active = active.running.len(),
                    "recovery rejected at concurrency cap"
                );
                return ExecutionReport {
                    execution_id,
                    plan_id: Some(plan.id.clone()),
                    status: ExecutionStatus::Rejected,
                    reason: Some("concurrent_limit".to_string()),
                    steps: Vec::new(),
                    started_at,
                    finished_at: Utc::now(),
                };
            }
            active
                .running
                .insert(execution_id.clone(), plan.id.clone());
            active
                .effectiveness
                .entry(plan.id.clone())
                .or_default()
                .executions += 1;
        }

        tracing::info!(
            execution_id = %execution_id,
            plan = %plan.id,
            error = %record,
            "recovery execution started"
        );

        let deadline = plan.deadline.unwrap_or(self.default_deadline);
        let progress = Arc::new(Mutex::new(StepProgress::default()));
        let run = self.run_steps(&plan, record, progress.clone());
        let (status, steps) = match tokio::time::timeout(deadline, run).await {
            Ok(status) => {
                let mut progress = lock_progress(&progress);
                (status, std::mem::take(&mut progress.reports))
            }
            Err(_) => {
                tracing::warn!(execution_id = %execution_id, plan = %plan.id, "recovery cancelled at plan deadline");
                let mut progress = lock_progress(&progress);
                let mut steps = std::mem::take(&mut progress.reports);
                // The step cut off mid-flight still records an outcome;
                // an attempt that already wrote its history entry is not
                // written twice.
                if let Some(running) = progress.running.take() {
                    self.classifier.record_outcome(running.strategy, false);
                    if !running.attempt_recorded {
                        record.record_attempt(RecoveryAttempt {
                            strategy: running.strategy,
                            attempt: running.attempt as i32,
                            succeeded: false,
                            timestamp: Utc::now(),
                            detail: Some("cancelled at plan deadline".to_string()),
                        });
                    }
                    steps.push(StepReport {
                        strategy: running.strategy,
                        state: StepState::Failed,
                        attempts: running.attempt,
                        detail: Some("cancelled at plan deadline".to_string()),
                    });
                }
                (ExecutionStatus::Cancelled, steps)
            }
        };

        {
            let mut active = self.lock();
            active.running.remove(&execution_id);
            if status == ExecutionStatus::Completed {
                if let Some(eff) = active.effectiveness.get_mut(&plan.id) {
                    eff.completed += 1;
                }
            }
        }

        tracing::info!(execution_id = %execution_id, plan = %plan.id, status = ?status, "recovery execution finished");
        ExecutionReport {
            execution_id,
            plan_id: Some(plan.id),
            status,
            reason: None,
            steps,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Select the matching plan with the highest priority, tie-broken by
    /// specificity.
    fn select_plan(&self, record: &ErrorRecord) -> Option<RecoveryPlan> {
        self.plans
            .iter()
            .filter(|p| p.matches(record))
            .max_by_key(|p| (p.priority, p.specificity()))
            .cloned()
    }

    async fn run_steps(
        &self,
        plan: &RecoveryPlan,
        record: &mut ErrorRecord,
        progress: Arc<Mutex<StepProgress>>,
    ) -> ExecutionStatus {
        let mut status = ExecutionStatus::Failed;

        for step in &plan.steps {
            // A false condition skips the step without touching anything.
            if let Some(condition) = &step.condition {
                if !condition.matches(record) {
                    lock_progress(&progress).reports.push(StepReport {
                        strategy: step.strategy,
                        state: StepState::Skipped,
                        attempts: 0,
                        detail: None,
                    });
                    continue;
                }
            }

            let (succeeded, report) = self.run_step(step, record, &progress).await;
            let strategy = step.strategy;
            lock_progress(&progress).reports.push(report);
            self.classifier.record_outcome(strategy, succeeded);

            if succeeded {
                match step.on_success {
                    StepAction::Complete | StepAction::Stop => {
                        status = ExecutionStatus::Completed;
                        break;
                    }
                    StepAction::Continue | StepAction::Escalate => {
                        status = ExecutionStatus::Completed;
                    }
                }
            } else {
                status = if strategy == RecoveryStrategy::Escalate {
                    ExecutionStatus::Escalated
                } else {
                    ExecutionStatus::Failed
                };
                match step.on_failure {
                    StepAction::Stop => break,
                    StepAction::Complete => {
                        status = ExecutionStatus::Completed;
                        break;
                    }
                    // Escalate and Continue both advance; the next step is
                    // typically the escalation handler.
                    StepAction::Escalate | StepAction::Continue => {}
                }
            }
        }

        status
    }

    async fn run_step(
        &self,
        step: &RecoveryStep,
        record: &mut ErrorRecord,
        progress: &Arc<Mutex<StepProgress>>,
    ) -> (bool, StepReport) {
        let Some(handler) = self.handlers.get(step.strategy) else {
            tracing::warn!(strategy = %step.strategy, "no handler registered for strategy");
            return (
                false,
                StepReport {
                    strategy: step.strategy,
                    state: StepState::Failed,
                    attempts: 0,
                    detail: Some("no handler registered".to_string()),
                },
            );
        };

        let mut detail = None;
        for attempt in 1..=step.max_attempts {
            lock_progress(progress).running = Some(RunningStep {
                strategy: step.strategy,
                attempt,
                attempt_recorded: false,
            });
            let outcome = match tokio::time::timeout(step.timeout, handler.apply(record)).await {
                Ok(outcome) => outcome,
                Err(_) => HandlerOutcome::Failed {
                    detail: format!("step timed out after {}ms", step.timeout.as_millis()),
                },
            };

            let (succeeded, attempt_detail) = match outcome {
                HandlerOutcome::Recovered { detail } => (true, detail),
                HandlerOutcome::Failed { detail } => (false, Some(detail)),
                HandlerOutcome::RetrySignal => (false, Some("retry signaled".to_string())),
            };

            record.record_attempt(RecoveryAttempt {
                strategy: step.strategy,
                attempt: attempt as i32,
                succeeded,
                timestamp: Utc::now(),
                detail: attempt_detail.clone(),
            });
            if let Some(running) = lock_progress(progress).running.as_mut() {
                running.attempt_recorded = true;
            }
            detail = attempt_detail;

            if succeeded {
                lock_progress(progress).running = None;
                return (
                    true,
                    StepReport {
                        strategy: step.strategy,
                        state: StepState::Completed,
                        attempts: attempt,
                        detail,
                    },
                );
            }

            if attempt < step.max_attempts {
                tokio::time::sleep(self.backoff.delay(attempt, None)).await;
            }
        }

        lock_progress(progress).running = None;
        (
            false,
            StepReport {
                strategy: step.strategy,
                state: StepState::Failed,
                attempts: step.max_attempts,
                detail,
            },
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActiveExecutions> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "executor.test.rs"]
mod tests;
