#![allow(clippy::unwrap_used)]

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use coderelay_config::CircuitConfig;
use coderelay_error::ErrorContext;
use coderelay_error::StatusCode;
use pretty_assertions::assert_eq;

use super::*;
use crate::circuit::CircuitState;

fn record(operation: &str) -> ErrorRecord {
    ErrorRecord::new(
        StatusCode::ChatSendFailed,
        "send failed",
        ErrorContext::new(operation, "dispatch"),
    )
}

fn registry() -> (HandlerRegistry, Arc<CircuitMap>) {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig::default()));
    let registry = HandlerRegistry::new(circuits.clone(), Duration::from_secs(30));
    (registry, circuits)
}

#[tokio::test]
async fn test_retry_handler_signals() {
    let (registry, _) = registry();
    let handler = registry.get(RecoveryStrategy::Retry).unwrap();
    assert_eq!(handler.apply(&record("op")).await, HandlerOutcome::RetrySignal);
}

#[tokio::test]
async fn test_ignore_recovers() {
    let (registry, _) = registry();
    let handler = registry.get(RecoveryStrategy::Ignore).unwrap();
    assert!(matches!(
        handler.apply(&record("op")).await,
        HandlerOutcome::Recovered { .. }
    ));
}

#[tokio::test]
async fn test_manual_fails() {
    let (registry, _) = registry();
    let handler = registry.get(RecoveryStrategy::Manual).unwrap();
    assert!(matches!(
        handler.apply(&record("op")).await,
        HandlerOutcome::Failed { .. }
    ));
}

#[tokio::test]
async fn test_circuit_break_forces_open() {
    let (registry, circuits) = registry();
    let handler = registry.get(RecoveryStrategy::CircuitBreaker).unwrap();

    let outcome = handler.apply(&record("chat_send")).await;
    assert!(matches!(outcome, HandlerOutcome::Recovered { .. }));
    assert_eq!(circuits.get("chat_send").state(), CircuitState::Open);
}

#[tokio::test]
async fn test_escalate_invokes_notifiers_and_fails() {
    struct Counting(AtomicU32);

    #[async_trait]
    impl EscalationNotifier for Counting {
        async fn notify(&self, _record: &ErrorRecord) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let notifier = Arc::new(Counting(AtomicU32::new(0)));
    let (registry, _) = registry();
    let registry = registry.with_escalation(vec![notifier.clone()]);

    let handler = registry.get(RecoveryStrategy::Escalate).unwrap();
    let outcome = handler.apply(&record("op")).await;

    assert!(matches!(outcome, HandlerOutcome::Failed { .. }));
    assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_injected_restart_action() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();
    let action: RecoveryAction = Arc::new(move |_record| {
        let calls = calls_in.clone();
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    let (registry, _) = registry();
    let registry = registry.with_restart(action);

    let handler = registry.get(RecoveryStrategy::Restart).unwrap();
    let outcome = handler.apply(&record("op")).await;
    assert!(matches!(outcome, HandlerOutcome::Recovered { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_handler_is_none() {
    let (registry, _) = registry();
    assert!(registry.get(RecoveryStrategy::Fallback).is_none());
}
