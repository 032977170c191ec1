#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_counters() {
    let metrics = MetricsRegistry::new(64);
    metrics.incr("events.accepted");
    metrics.incr("events.accepted");
    metrics.incr_by("events.failed", 3);

    assert_eq!(metrics.counter("events.accepted"), 2);
    assert_eq!(metrics.counter("events.failed"), 3);
    assert_eq!(metrics.counter("unknown"), 0);
}

#[test]
fn test_gauges() {
    let metrics = MetricsRegistry::new(64);
    metrics.gauge("queue.depth", 12.0);
    metrics.gauge("queue.depth", 9.0);
    assert_eq!(metrics.gauge_value("queue.depth"), Some(9.0));
    assert_eq!(metrics.gauge_value("missing"), None);
}

#[test]
fn test_histogram_buckets_and_quantile() {
    let metrics = MetricsRegistry::new(64);
    for v in [2.0, 4.0, 8.0, 20.0, 40.0, 90.0, 200.0, 400.0, 900.0, 2000.0] {
        metrics.observe("dispatch_ms", v);
    }

    let histogram = metrics.histogram("dispatch_ms").unwrap();
    assert_eq!(histogram.count, 10);
    assert!(histogram.sum > 3600.0);
    // Median falls in the 50ms bucket.
    assert_eq!(histogram.quantile(0.5), 50.0);
    assert!(histogram.quantile(1.0) >= 1000.0);
}

#[test]
fn test_series_ring_is_bounded() {
    let metrics = MetricsRegistry::new(16);
    for _ in 0..100 {
        metrics.incr("spam");
    }
    assert!(metrics.series().len() <= 16);
    assert_eq!(metrics.counter("spam"), 100);
}

#[tokio::test]
async fn test_stream_subscription() {
    let metrics = MetricsRegistry::new(64);
    let mut rx = metrics.subscribe();

    metrics.gauge("heap_mb", 31.5);

    let sample = rx.recv().await.unwrap();
    assert_eq!(sample.name, "heap_mb");
    assert_eq!(sample.value, 31.5);
}

#[test]
fn test_outcome_observer_bridge() {
    use coderelay_resilience::OutcomeObserver;

    let metrics = MetricsRegistry::new(64);
    metrics.on_attempt("chat_send", true, Duration::from_millis(12));
    metrics.on_attempt("chat_send", false, Duration::from_millis(800));
    metrics.on_circuit_rejection("chat_send");

    assert_eq!(metrics.counter("attempts.chat_send.success"), 1);
    assert_eq!(metrics.counter("attempts.chat_send.failure"), 1);
    assert_eq!(metrics.counter("circuit_rejections.chat_send"), 1);
    assert_eq!(metrics.histogram("duration_ms.chat_send").unwrap().count, 2);
}
