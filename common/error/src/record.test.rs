#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

fn ctx() -> ErrorContext {
    ErrorContext::new("chat_send", "dispatch").with_correlation_id("corr-1")
}

#[test]
fn test_record_defaults_from_code() {
    let record = ErrorRecord::new(StatusCode::NetworkError, "connection reset", ctx());
    assert_eq!(record.category, ErrorCategory::Network);
    assert!(record.retryable);
    assert_eq!(record.severity, Severity::Low);
}

#[test]
fn test_default_severity_tiers() {
    let integrity = ErrorRecord::new(StatusCode::IntegrityError, "bad checksum", ctx());
    assert_eq!(integrity.severity, Severity::Critical);

    let down = ErrorRecord::new(StatusCode::BridgeNotRunning, "no worker", ctx());
    assert_eq!(down.severity, Severity::High);

    let timeout = ErrorRecord::new(StatusCode::StartupTimeout, "slow start", ctx());
    assert_eq!(timeout.severity, Severity::Medium);
}

#[test]
fn test_non_retryable_strips_retry_hints() {
    let record = ErrorRecord::new(StatusCode::ValidationFailed, "bad input", ctx())
        .with_recovery_hints(vec![
            RecoveryStrategy::Retry,
            RecoveryStrategy::CircuitBreaker,
            RecoveryStrategy::Escalate,
        ]);

    assert_eq!(record.recovery_hints, vec![RecoveryStrategy::Escalate]);
}

#[test]
fn test_flipping_retryable_re_enforces_invariant() {
    let record = ErrorRecord::new(StatusCode::NetworkError, "flaky", ctx())
        .with_recovery_hints(vec![RecoveryStrategy::Retry, RecoveryStrategy::Fallback])
        .with_retryable(false);

    assert_eq!(record.recovery_hints, vec![RecoveryStrategy::Fallback]);
}

#[test]
fn test_attempt_history() {
    let mut record = ErrorRecord::new(StatusCode::ChatSendFailed, "send failed", ctx());
    record.record_attempt(RecoveryAttempt {
        strategy: RecoveryStrategy::Retry,
        attempt: 1,
        succeeded: false,
        timestamp: Utc::now(),
        detail: None,
    });
    record.record_attempt(RecoveryAttempt {
        strategy: RecoveryStrategy::Retry,
        attempt: 2,
        succeeded: true,
        timestamp: Utc::now(),
        detail: Some("recovered".to_string()),
    });

    assert_eq!(record.history.len(), 2);
    assert_eq!(record.failed_attempts(), 1);
}

#[test]
fn test_severity_stepping() {
    assert_eq!(Severity::Critical.lowered(), Severity::High);
    assert_eq!(Severity::Low.lowered(), Severity::Low);
    assert_eq!(Severity::Medium.raised(), Severity::High);
    assert_eq!(Severity::Critical.raised(), Severity::Critical);
}

#[test]
fn test_from_error() {
    let err = crate::PlainError::new("spool unreadable", StatusCode::IoError);
    let record = ErrorRecord::from_error(&err, ctx());
    assert_eq!(record.code, StatusCode::IoError);
    assert_eq!(record.message, "spool unreadable");
    assert!(!record.retryable);
}

#[test]
fn test_serde_round_trip() {
    let record = ErrorRecord::new(StatusCode::ChatRateLimited, "429", ctx())
        .with_recovery_hints(vec![RecoveryStrategy::Retry]);
    let json = serde_json::to_string(&record).unwrap();
    let back: ErrorRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.code, StatusCode::ChatRateLimited);
    assert_eq!(back.recovery_hints, vec![RecoveryStrategy::Retry]);
    assert_eq!(back.context.correlation_id.as_deref(), Some("corr-1"));
}
