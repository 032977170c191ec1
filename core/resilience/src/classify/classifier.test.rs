#![allow(clippy::unwrap_used)]

use coderelay_error::ErrorContext;
use coderelay_error::StatusCode;
use pretty_assertions::assert_eq;

use super::*;

fn record(code: StatusCode, message: &str) -> ErrorRecord {
    ErrorRecord::new(code, message, ErrorContext::new("chat_send", "dispatch"))
}

#[test]
fn test_best_pattern_wins() {
    let classifier = Classifier::with_defaults();
    let verdict = classifier.classify(&record(StatusCode::ChatRateLimited, "rate limit hit"));

    assert_eq!(verdict.pattern_id.as_deref(), Some("chat_rate_limit"));
    assert_eq!(verdict.category, ErrorCategory::Chat);
    assert!(verdict.retryable);
    assert_eq!(verdict.strategy, RecoveryStrategy::Retry);
    assert_eq!(verdict.confidence, 1.0);
}

#[test]
fn test_unmatched_synthesizes_defaults() {
    // An empty rule set guarantees no match.
    let classifier = Classifier::new(Vec::new(), ClassifierConfig::default());
    let r = record(StatusCode::NetworkError, "flaky");
    let verdict = classifier.classify(&r);

    assert_eq!(verdict.pattern_id, None);
    assert_eq!(verdict.category, r.category);
    assert_eq!(verdict.severity, r.severity);
    assert_eq!(verdict.retryable, r.retryable);
    assert_eq!(verdict.strategy, RecoveryStrategy::Retry);
    assert_eq!(verdict.confidence, 0.5);
}

#[test]
fn test_unmatched_non_retryable_gets_manual() {
    let classifier = Classifier::new(Vec::new(), ClassifierConfig::default());
    let verdict = classifier.classify(&record(StatusCode::SecurityPolicyViolation, "denied"));
    assert_eq!(verdict.strategy, RecoveryStrategy::Manual);
}

#[test]
fn test_unmatched_prefers_recovery_hint() {
    let classifier = Classifier::new(Vec::new(), ClassifierConfig::default());
    let r = record(StatusCode::BridgeNotRunning, "down")
        .with_recovery_hints(vec![RecoveryStrategy::Restart]);
    let verdict = classifier.classify(&r);
    assert_eq!(verdict.strategy, RecoveryStrategy::Restart);
}

#[test]
fn test_rare_medium_pattern_raises_to_high() {
    // chat_send_failure has base severity medium; the first few fires are
    // below the rare threshold, so severity rises.
    let classifier = Classifier::with_defaults();
    let verdict = classifier.classify(&record(StatusCode::ChatSendFailed, "send failed"));
    assert_eq!(verdict.pattern_id.as_deref(), Some("chat_send_failure"));
    assert_eq!(verdict.severity, Severity::High);
}

#[test]
fn test_noisy_pattern_lowers_severity() {
    let config = ClassifierConfig {
        lower_severity_above: 10,
        raise_severity_below: 0,
        frequency_window: std::time::Duration::from_secs(3600),
    };
    let classifier = Classifier::new(crate::classify::default_patterns(), config);

    let r = record(StatusCode::ChatSendFailed, "send failed");
    let mut last = None;
    for _ in 0..12 {
        last = Some(classifier.classify(&r));
    }
    // Base medium, lowered one level once past the noise threshold.
    assert_eq!(last.unwrap().severity, Severity::Low);
}

#[test]
fn test_stats_accumulate() {
    let classifier = Classifier::with_defaults();
    classifier.classify(&record(StatusCode::ChatRateLimited, "rate limit"));
    classifier.classify(&record(StatusCode::IntegrityError, "bad checksum"));
    classifier.record_outcome(RecoveryStrategy::Retry, true);

    let stats = classifier.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.by_pattern.get("chat_rate_limit"), Some(&1));
    assert!(stats.strategy_rates.contains_key(&RecoveryStrategy::Retry));
}
