//! The recovery plans shipped by default.

use std::time::Duration;

use coderelay_error::ErrorCategory;
use coderelay_error::RecoveryStrategy;
use coderelay_error::Severity;
use coderelay_error::StatusCode;

use crate::recovery::plan::PlanCondition;
use crate::recovery::plan::PlanPriority;
use crate::recovery::plan::RecoveryPlan;
use crate::recovery::plan::RecoveryStep;
use crate::recovery::plan::StepAction;

/// Built-in plan registry.
///
/// `bridge_restart` handles a dead or unhealthy worker: brief retries in
/// case the health endpoint blipped, then restarts, then escalation.
/// `chat_rate_limit` leans on retry alone. `spool_degraded` falls back to
/// local persistence before waking an operator.
pub fn default_plans() -> Vec<RecoveryPlan> {
    vec![
        RecoveryPlan::new("bridge_restart", PlanPriority::High)
            .when(PlanCondition::Category(ErrorCategory::Bridge))
            .with_deadline(Duration::from_secs(180))
            .step(
                RecoveryStep::new(RecoveryStrategy::Retry)
                    .with_max_attempts(2)
                    .with_timeout(Duration::from_secs(5))
                    .on_success(StepAction::Complete),
            )
            .step(
                RecoveryStep::new(RecoveryStrategy::Restart)
                    .with_max_attempts(3)
                    .with_timeout(Duration::from_secs(30))
                    .on_success(StepAction::Complete)
                    .on_failure(StepAction::Escalate),
            )
            .step(
                RecoveryStep::new(RecoveryStrategy::Escalate)
                    .with_timeout(Duration::from_secs(10))
                    .on_failure(StepAction::Stop),
            ),
        RecoveryPlan::new("chat_rate_limit", PlanPriority::High)
            .when(PlanCondition::Code(StatusCode::ChatRateLimited))
            .step(
                RecoveryStep::new(RecoveryStrategy::Retry)
                    .with_max_attempts(5)
                    .with_timeout(Duration::from_secs(60))
                    .on_success(StepAction::Complete)
                    .on_failure(StepAction::Stop),
            ),
        RecoveryPlan::new("chat_unreachable", PlanPriority::Normal)
            .when(PlanCondition::Category(ErrorCategory::Chat))
            .when(PlanCondition::Retryable(true))
            .step(
                RecoveryStep::new(RecoveryStrategy::Retry)
                    .with_max_attempts(3)
                    .with_timeout(Duration::from_secs(30))
                    .on_success(StepAction::Complete),
            )
            .step(
                RecoveryStep::new(RecoveryStrategy::CircuitBreaker)
                    .with_timeout(Duration::from_secs(5))
                    .on_success(StepAction::Complete),
            ),
        RecoveryPlan::new("spool_degraded", PlanPriority::Critical)
            .when(PlanCondition::Category(ErrorCategory::Filesystem))
            .when(PlanCondition::MinSeverity(Severity::High))
            .step(
                RecoveryStep::new(RecoveryStrategy::Fallback)
                    .with_max_attempts(2)
                    .with_timeout(Duration::from_secs(10))
                    .on_success(StepAction::Complete)
                    .on_failure(StepAction::Escalate),
            )
            .step(
                RecoveryStep::new(RecoveryStrategy::Escalate)
                    .with_timeout(Duration::from_secs(10))
                    .on_failure(StepAction::Stop),
            ),
        RecoveryPlan::new("resource_pressure", PlanPriority::High)
            .when(PlanCondition::Category(ErrorCategory::Resource))
            .when(PlanCondition::MinSeverity(Severity::High))
            .step(
                RecoveryStep::new(RecoveryStrategy::GracefulDegradation)
                    .with_timeout(Duration::from_secs(10))
                    .on_success(StepAction::Complete)
                    .on_failure(StepAction::Escalate),
            )
            .step(
                RecoveryStep::new(RecoveryStrategy::Escalate)
                    .with_timeout(Duration::from_secs(10))
                    .on_failure(StepAction::Stop),
            ),
    ]
}

#[cfg(test)]
#[path = "builtin.test.rs"]
mod tests;
