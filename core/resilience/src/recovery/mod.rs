//! Recovery plans and the bounded executor.

mod builtin;
mod executor;
mod handlers;
mod plan;

pub use builtin::default_plans;
pub use executor::ExecutionReport;
pub use executor::ExecutionStatus;
pub use executor::PlanEffectiveness;
pub use executor::RecoveryOrchestrator;
pub use handlers::EscalationNotifier;
pub use handlers::HandlerOutcome;
pub use handlers::HandlerRegistry;
pub use handlers::RecoveryAction;
pub use handlers::StrategyHandler;
pub use plan::PlanCondition;
pub use plan::PlanPriority;
pub use plan::RecoveryPlan;
pub use plan::RecoveryStep;
pub use plan::StepAction;
pub use plan::StepReport;
pub use plan::StepState;
