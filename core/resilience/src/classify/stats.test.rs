#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_classification_totals() {
    let mut stats = ClassifierStats::new();
    let now = Utc::now();
    stats.record_classification(ErrorCategory::Chat, Severity::Low, Some("p1"), now);
    stats.record_classification(ErrorCategory::Chat, Severity::High, Some("p1"), now);
    stats.record_classification(ErrorCategory::Network, Severity::Low, None, now);

    let snap = stats.snapshot();
    assert_eq!(snap.total, 3);
    assert_eq!(snap.by_category.get(&ErrorCategory::Chat), Some(&2));
    assert_eq!(snap.by_severity.get(&Severity::Low), Some(&2));
    assert_eq!(snap.by_pattern.get("p1"), Some(&2));
}

#[test]
fn test_trend_buckets_by_hour() {
    let mut stats = ClassifierStats::new();
    let base = Utc::now();
    stats.record_classification(ErrorCategory::Chat, Severity::Low, None, base);
    stats.record_classification(ErrorCategory::Chat, Severity::Low, None, base);
    stats.record_classification(
        ErrorCategory::Chat,
        Severity::Low,
        None,
        base + chrono::Duration::hours(1),
    );

    let snap = stats.snapshot();
    assert_eq!(snap.trend.len(), 2);
    assert_eq!(snap.trend[0].count, 2);
    assert_eq!(snap.trend[1].count, 1);
}

#[test]
fn test_strategy_rate_smoothing() {
    let mut stats = ClassifierStats::new();

    stats.record_outcome(RecoveryStrategy::Retry, true);
    let first = stats.strategy_rate(RecoveryStrategy::Retry).unwrap();
    assert_eq!(first.rate, 1.0);
    assert_eq!(first.samples, 1);

    stats.record_outcome(RecoveryStrategy::Retry, false);
    let second = stats.strategy_rate(RecoveryStrategy::Retry).unwrap();
    // 0.2 * 0.0 + 0.8 * 1.0
    assert!((second.rate - 0.8).abs() < 1e-9);
    assert_eq!(second.samples, 2);

    stats.record_outcome(RecoveryStrategy::Retry, true);
    let third = stats.strategy_rate(RecoveryStrategy::Retry).unwrap();
    // 0.2 * 1.0 + 0.8 * 0.8
    assert!((third.rate - 0.84).abs() < 1e-9);
}

#[test]
fn test_unknown_strategy_has_no_rate() {
    let stats = ClassifierStats::new();
    assert!(stats.strategy_rate(RecoveryStrategy::Manual).is_none());
}
