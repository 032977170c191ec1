#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use coderelay_config::CircuitConfig;
use pretty_assertions::assert_eq;

use super::*;
use crate::circuit::CircuitState;

fn middleware(max_attempts: u32) -> Resilient {
    let circuits = Arc::new(CircuitMap::new(CircuitConfig {
        failure_threshold: 5,
        window: Duration::from_secs(60),
        cool_down: Duration::from_millis(100),
        max_cool_down: Duration::from_secs(5),
        half_open_probes: 1,
    }));
    Resilient::new(
        ResilientOptions {
            max_attempts,
            attempt_timeout: Duration::from_millis(500),
        },
        BackoffPolicy::new(Duration::from_millis(10), 2.0, Duration::from_millis(100), 0.0),
        circuits,
    )
}

fn retryable_failure(message: &str) -> OpFailure {
    OpFailure::new(ErrorRecord::new(
        StatusCode::ChatRateLimited,
        message,
        ErrorContext::new("chat_send", "test"),
    ))
}

fn fatal_failure(message: &str) -> OpFailure {
    OpFailure::new(ErrorRecord::new(
        StatusCode::ValidationFailed,
        message,
        ErrorContext::new("chat_send", "test"),
    ))
}

#[derive(Default)]
struct CountingObserver {
    attempts: AtomicU32,
    failures: AtomicU32,
    rejections: AtomicU32,
}

impl OutcomeObserver for CountingObserver {
    fn on_attempt(&self, _operation: &str, succeeded: bool, _duration: Duration) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !succeeded {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_circuit_rejection(&self, _operation: &str) {
        self.rejections.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_success_first_try() {
    let m = middleware(3);
    let result: Result<i32, ErrorRecord> = m.call("op", || async { Ok(42) }).await;
    assert_eq!(result.unwrap(), 42);
}

#[tokio::test]
async fn test_retries_then_succeeds() {
    let m = middleware(5);
    let observer = Arc::new(CountingObserver::default());
    let m = m.with_observer(observer.clone());

    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();
    let result = m
        .call("chat_send", move || {
            let calls = calls_in.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(retryable_failure("rate limited"))
                } else {
                    Ok("sent")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "sent");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(observer.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(observer.failures.load(Ordering::SeqCst), 2);
    // Two failures is under the threshold of five.
    assert_eq!(m.circuits().get("chat_send").state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_non_retryable_fails_immediately() {
    let m = middleware(5);
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();

    let result: Result<(), ErrorRecord> = m
        .call("op", move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(fatal_failure("bad input"))
            }
        })
        .await;

    let record = result.unwrap_err();
    assert_eq!(record.code, StatusCode::ValidationFailed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_attempts_bounded_by_max() {
    let m = middleware(3);
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();

    let result: Result<(), ErrorRecord> = m
        .call("op", move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(retryable_failure("still down"))
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_open_circuit_fails_fast() {
    let m = middleware(1);
    let observer = Arc::new(CountingObserver::default());
    let m = m.with_observer(observer.clone());

    m.circuits().get("op").force_open(Duration::from_secs(60));

    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();
    let result: Result<(), ErrorRecord> = m
        .call("op", move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

    let record = result.unwrap_err();
    assert_eq!(record.code, StatusCode::CircuitOpen);
    // The operation was never invoked.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(observer.rejections.load(Ordering::SeqCst), 1);
    assert!(record.context.metadata.contains_key("retry_after_ms"));
}

#[tokio::test]
async fn test_timeout_becomes_typed_record() {
    let m = Resilient::new(
        ResilientOptions {
            max_attempts: 1,
            attempt_timeout: Duration::from_millis(20),
        },
        BackoffPolicy::new(Duration::from_millis(1), 2.0, Duration::from_millis(10), 0.0),
        Arc::new(CircuitMap::new(CircuitConfig::default())),
    );

    let result: Result<(), ErrorRecord> = m
        .call("slow", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

    assert_eq!(result.unwrap_err().code, StatusCode::Timeout);
}

#[tokio::test]
async fn test_retry_after_hint_shapes_delay() {
    let m = middleware(2);
    let delays = Arc::new(Mutex::new(Vec::new()));

    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = calls.clone();
    let started = Instant::now();
    let delays_in = delays.clone();

    let result = m
        .call("op", move || {
            let calls = calls_in.clone();
            let delays = delays_in.clone();
            async move {
                delays.lock().unwrap().push(started.elapsed());
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(retryable_failure("429").with_retry_after(Duration::from_millis(80)))
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert!(result.is_ok());
    let delays = delays.lock().unwrap();
    assert_eq!(delays.len(), 2);
    // Second attempt waited for (capped) retry-after hint of 80ms -> 100ms cap applies to backoff max.
    assert!(delays[1] >= Duration::from_millis(75), "delay was {:?}", delays[1]);
}
