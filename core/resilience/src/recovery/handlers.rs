//! Strategy handlers dispatched by the recovery executor.
//!
//! Handlers are looked up by strategy tag in a registry. The environment-
//! touching strategies (fallback, restart, graceful degradation) are
//! injected by the binary as async actions; the structural ones (retry,
//! ignore, manual, circuit-break, escalate) are built in.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coderelay_error::ErrorRecord;
use coderelay_error::RecoveryStrategy;

use crate::circuit::CircuitMap;

/// What a handler attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The strategy recovered the condition.
    Recovered { detail: Option<String> },
    /// The strategy ran but did not recover.
    Failed { detail: String },
    /// The caller should retry the original operation; the step itself
    /// reports failure so the execution keeps looping.
    RetrySignal,
}

/// A strategy implementation.
#[async_trait]
pub trait StrategyHandler: Send + Sync {
    /// Apply the strategy to the error.
    async fn apply(&self, record: &ErrorRecord) -> HandlerOutcome;
}

/// Out-of-band notifier invoked by the escalate strategy.
#[async_trait]
pub trait EscalationNotifier: Send + Sync {
    /// Deliver the escalation.
    async fn notify(&self, record: &ErrorRecord);
}

/// Async action injected for environment-touching strategies.
///
/// The action receives the error record and reports success or a failure
/// detail.
pub type RecoveryAction = Arc<
    dyn Fn(ErrorRecord) -> Pin<Box<dyn std::future::Future<Output = Result<(), String>> + Send>>
        + Send
        + Sync,
>;

/// Handler wrapping an injected [`RecoveryAction`].
pub struct ActionHandler {
    action: RecoveryAction,
}

impl ActionHandler {
    /// Wrap an action.
    pub fn new(action: RecoveryAction) -> Self {
        Self { action }
    }
}

#[async_trait]
impl StrategyHandler for ActionHandler {
    async fn apply(&self, record: &ErrorRecord) -> HandlerOutcome {
        match (self.action)(record.clone()).await {
            Ok(()) => HandlerOutcome::Recovered { detail: None },
            Err(detail) => HandlerOutcome::Failed { detail },
        }
    }
}

/// `retry`: signal the caller to retry the original operation.
struct RetryHandler;

#[async_trait]
impl StrategyHandler for RetryHandler {
    async fn apply(&self, _record: &ErrorRecord) -> HandlerOutcome {
        HandlerOutcome::RetrySignal
    }
}

/// `ignore`: record and succeed.
struct IgnoreHandler;

#[async_trait]
impl StrategyHandler for IgnoreHandler {
    async fn apply(&self, record: &ErrorRecord) -> HandlerOutcome {
        tracing::info!(error = %record, "error ignored by recovery policy");
        HandlerOutcome::Recovered {
            detail: Some("ignored".to_string()),
        }
    }
}

/// `manual`: record and fail, parking the incident for a human.
struct ManualHandler;

#[async_trait]
impl StrategyHandler for ManualHandler {
    async fn apply(&self, record: &ErrorRecord) -> HandlerOutcome {
        tracing::warn!(error = %record, "error parked for manual intervention");
        HandlerOutcome::Failed {
            detail: "parked for manual intervention".to_string(),
        }
    }
}

/// `circuit_breaker`: force the operation's circuit open for a cool-down.
struct CircuitBreakHandler {
    circuits: Arc<CircuitMap>,
    cool_down: Duration,
}

#[async_trait]
impl StrategyHandler for CircuitBreakHandler {
    async fn apply(&self, record: &ErrorRecord) -> HandlerOutcome {
        let key = &record.context.operation;
        self.circuits.get(key).force_open(self.cool_down);
        HandlerOutcome::Recovered {
            detail: Some(format!("circuit {key} forced open")),
        }
    }
}

/// `escalate`: notify operators; does not recover.
struct EscalateHandler {
    notifiers: Vec<Arc<dyn EscalationNotifier>>,
}

#[async_trait]
impl StrategyHandler for EscalateHandler {
    async fn apply(&self, record: &ErrorRecord) -> HandlerOutcome {
        for notifier in &self.notifiers {
            notifier.notify(record).await;
        }
        HandlerOutcome::Failed {
            detail: format!("escalated to {} notifier(s)", self.notifiers.len()),
        }
    }
}

/// Registry mapping strategy tags to handlers.
pub struct HandlerRegistry {
    handlers: HashMap<RecoveryStrategy, Arc<dyn StrategyHandler>>,
}

impl HandlerRegistry {
    /// Registry with the structural handlers installed.
    ///
    /// `fallback`, `restart` and `graceful_degradation` report failure
    /// until the binary injects their actions.
    pub fn new(circuits: Arc<CircuitMap>, circuit_cool_down: Duration) -> Self {
        let mut handlers: HashMap<RecoveryStrategy, Arc<dyn StrategyHandler>> = HashMap::new();
        handlers.insert(RecoveryStrategy::Retry, Arc::new(RetryHandler));
        handlers.insert(RecoveryStrategy::Ignore, Arc::new(IgnoreHandler));
        handlers.insert(RecoveryStrategy::Manual, Arc::new(ManualHandler));
        handlers.insert(
            RecoveryStrategy::CircuitBreaker,
            Arc::new(CircuitBreakHandler {
                circuits,
                cool_down: circuit_cool_down,
            }),
        );
        handlers.insert(
            RecoveryStrategy::Escalate,
            Arc::new(EscalateHandler {
                notifiers: Vec::new(),
            }),
        );
        Self { handlers }
    }

    /// Install escalation notifiers.
    pub fn with_escalation(mut self, notifiers: Vec<Arc<dyn EscalationNotifier>>) -> Self {
        self.handlers.insert(
            RecoveryStrategy::Escalate,
            Arc::new(EscalateHandler { notifiers }),
        );
        self
    }

    /// Inject the fallback action.
    pub fn with_fallback(mut self, action: RecoveryAction) -> Self {
        self.handlers
            .insert(RecoveryStrategy::Fallback, Arc::new(ActionHandler::new(action)));
        self
    }

    /// Inject the restart action (wired to the bridge supervisor).
    pub fn with_restart(mut self, action: RecoveryAction) -> Self {
        self.handlers
            .insert(RecoveryStrategy::Restart, Arc::new(ActionHandler::new(action)));
        self
    }

    /// Inject the graceful-degradation action.
    pub fn with_degradation(mut self, action: RecoveryAction) -> Self {
        self.handlers.insert(
            RecoveryStrategy::GracefulDegradation,
            Arc::new(ActionHandler::new(action)),
        );
        self
    }

    /// Install or replace an arbitrary handler.
    pub fn insert(&mut self, strategy: RecoveryStrategy, handler: Arc<dyn StrategyHandler>) {
        self.handlers.insert(strategy, handler);
    }

    /// Look up the handler for a strategy.
    pub fn get(&self, strategy: RecoveryStrategy) -> Option<Arc<dyn StrategyHandler>> {
        self.handlers.get(&strategy).cloned()
    }
}

#[cfg(test)]
#[path = "handlers.test.rs"]
mod tests;
