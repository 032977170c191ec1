//! Recovery plans: named, ordered step sequences triggered by error
//! predicates.

use std::time::Duration;

use coderelay_error::ErrorCategory;
use coderelay_error::ErrorRecord;
use coderelay_error::RecoveryStrategy;
use coderelay_error::Severity;
use coderelay_error::StatusCode;
use serde::Serialize;

/// Plan selection priority; higher wins on predicate ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPriority {
    Low,
    Normal,
    High,
    Critical,
}

/// One predicate condition over an error record.
#[derive(Debug, Clone)]
pub enum PlanCondition {
    /// Error category equals.
    Category(ErrorCategory),
    /// Status code equals.
    Code(StatusCode),
    /// Severity at least.
    MinSeverity(Severity),
    /// Originating component equals.
    Component(String),
    /// Operation equals.
    Operation(String),
    /// Retryability equals.
    Retryable(bool),
}

impl PlanCondition {
    /// Whether the condition holds for the record.
    pub fn matches(&self, record: &ErrorRecord) -> bool {
        match self {
            PlanCondition::Category(c) => record.category == *c,
            PlanCondition::Code(code) => record.code == *code,
            PlanCondition::MinSeverity(s) => record.severity >= *s,
            PlanCondition::Component(c) => record.context.component == *c,
            PlanCondition::Operation(o) => record.context.operation == *o,
            PlanCondition::Retryable(r) => record.retryable == *r,
        }
    }
}

/// What to do after a step succeeds or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Move on to the next step.
    Continue,
    /// Halt the execution.
    Stop,
    /// Advance to the next step (typically an escalation handler).
    Escalate,
    /// End the execution successfully.
    Complete,
}

/// One step of a plan.
#[derive(Debug, Clone)]
pub struct RecoveryStep {
    /// Strategy applied by this step.
    pub strategy: RecoveryStrategy,
    /// Attempts for this step, including the first.
    pub max_attempts: u32,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Optional gate; a false condition skips the step entirely.
    pub condition: Option<PlanCondition>,
    /// Action on step success.
    pub on_success: StepAction,
    /// Action on step failure (after all attempts).
    pub on_failure: StepAction,
}

impl RecoveryStep {
    /// A step with spec defaults: one attempt, continue on success,
    /// continue on failure.
    pub fn new(strategy: RecoveryStrategy) -> Self {
        Self {
            strategy,
            max_attempts: 1,
            timeout: Duration::from_secs(30),
            condition: None,
            on_success: StepAction::Continue,
            on_failure: StepAction::Continue,
        }
    }

    /// Set the attempts for this step.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gate the step on a condition.
    pub fn with_condition(mut self, condition: PlanCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the on-success action.
    pub fn on_success(mut self, action: StepAction) -> Self {
        self.on_success = action;
        self
    }

    /// Set the on-failure action.
    pub fn on_failure(mut self, action: StepAction) -> Self {
        self.on_failure = action;
        self
    }
}

/// A named recovery plan.
#[derive(Debug, Clone)]
pub struct RecoveryPlan {
    /// Stable plan id.
    pub id: String,
    /// Selection priority.
    pub priority: PlanPriority,
    /// Overall deadline; `None` uses the orchestrator default.
    pub deadline: Option<Duration>,
    /// Predicate: every condition must match.
    pub conditions: Vec<PlanCondition>,
    /// Ordered steps.
    pub steps: Vec<RecoveryStep>,
}

impl RecoveryPlan {
    /// Create a plan.
    pub fn new(id: impl Into<String>, priority: PlanPriority) -> Self {
        Self {
            id: id.into(),
            priority,
            deadline: None,
            conditions: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Add a predicate condition.
    pub fn when(mut self, condition: PlanCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add a step.
    pub fn step(mut self, step: RecoveryStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Set the overall deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether the plan's predicate matches the record.
    pub fn matches(&self, record: &ErrorRecord) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.matches(record))
    }

    /// Tie-break specificity: number of predicate conditions.
    pub fn specificity(&self) -> usize {
        self.conditions.len()
    }
}

/// Per-step lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Report for one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Step strategy.
    pub strategy: RecoveryStrategy,
    /// Final state.
    pub state: StepState,
    /// Attempts made.
    pub attempts: u32,
    /// Handler detail, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
#[path = "plan.test.rs"]
mod tests;
