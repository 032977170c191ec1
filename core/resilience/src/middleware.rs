//! Resilience middleware: timeout + retry + circuit breaker around any
//! async operation.
//!
//! Operations return [`OpFailure`] on error, carrying the classified
//! record plus explicit `retry_after` / `should_trip` signals instead of
//! encoding them in exception control flow. The middleware converts its
//! own conditions (open circuit, timeout, exhaustion) into
//! [`ErrorRecord`]s, so callers only ever see typed records.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use coderelay_error::ErrorContext;
use coderelay_error::ErrorRecord;
use coderelay_error::StatusCode;

use crate::backoff::BackoffPolicy;
use crate::circuit::Admission;
use crate::circuit::CircuitMap;

/// A failed operation attempt.
#[derive(Debug)]
pub struct OpFailure {
    /// The classified failure.
    pub record: ErrorRecord,
    /// Explicit retry-after hint from the remote side, if any.
    pub retry_after: Option<Duration>,
    /// Whether this failure counts against the operation's circuit.
    pub should_trip: bool,
}

impl OpFailure {
    /// A failure that counts against the circuit.
    pub fn new(record: ErrorRecord) -> Self {
        Self {
            record,
            retry_after: None,
            should_trip: true,
        }
    }

    /// Attach a retry-after hint.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Mark the failure as not circuit-relevant (e.g. caller mistakes).
    pub fn without_trip(mut self) -> Self {
        self.should_trip = false;
        self
    }
}

/// Observer for attempt outcomes; wired to the metrics hub by the binary.
pub trait OutcomeObserver: Send + Sync {
    /// Called once per attempt with its duration.
    fn on_attempt(&self, operation: &str, succeeded: bool, duration: Duration);
    /// Called when a call is rejected by an open circuit.
    fn on_circuit_rejection(&self, operation: &str);
}

/// Observer that records nothing.
pub struct NoopObserver;

impl OutcomeObserver for NoopObserver {
    fn on_attempt(&self, _operation: &str, _succeeded: bool, _duration: Duration) {}
    fn on_circuit_rejection(&self, _operation: &str) {}
}

/// Middleware configuration.
#[derive(Debug, Clone)]
pub struct ResilientOptions {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Per-attempt timeout.
    pub attempt_timeout: Duration,
}

impl Default for ResilientOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Wraps operations with retry, per-attempt timeout and a named circuit.
pub struct Resilient {
    options: ResilientOptions,
    backoff: BackoffPolicy,
    circuits: Arc<CircuitMap>,
    observer: Arc<dyn OutcomeObserver>,
}

impl Resilient {
    /// Create middleware over a shared circuit map.
    pub fn new(
        options: ResilientOptions,
        backoff: BackoffPolicy,
        circuits: Arc<CircuitMap>,
    ) -> Self {
        Self {
            options,
            backoff,
            circuits,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach an outcome observer.
    pub fn with_observer(mut self, observer: Arc<dyn OutcomeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The shared circuit map.
    pub fn circuits(&self) -> &Arc<CircuitMap> {
        &self.circuits
    }

    /// Run `op` under the full retry + timeout + circuit policy.
    ///
    /// `op` is re-invoked for every attempt. The returned error is always
    /// a typed record: the operation's own on exhaustion, or a
    /// `CIRCUIT_OPEN` / `TIMEOUT` record produced here.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ErrorRecord>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OpFailure>>,
    {
        let circuit = self.circuits.get(operation);
        let mut last_record: Option<ErrorRecord> = None;

        for attempt in 1..=self.options.max_attempts {
            match circuit.admit() {
                Admission::Allowed | Admission::Probe => {}
                Admission::Rejected { retry_after } => {
                    self.observer.on_circuit_rejection(operation);
                    return Err(self.circuit_open_record(operation, retry_after));
                }
            }

            let started = Instant::now();
            let outcome = tokio::time::timeout(self.options.attempt_timeout, op()).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(Ok(value)) => {
                    circuit.record_success();
                    self.observer.on_attempt(operation, true, elapsed);
                    return Ok(value);
                }
                Ok(Err(failure)) => {
                    if failure.should_trip {
                        circuit.record_failure();
                    }
                    self.observer.on_attempt(operation, false, elapsed);
                    tracing::debug!(
                        operation,
                        attempt,
                        error = %failure.record,
                        "attempt failed"
                    );

                    let retryable = failure.record.retryable;
                    let retry_after = failure.retry_after;
                    last_record = Some(failure.record);
                    if !retryable {
                        break;
                    }
                    if attempt < self.options.max_attempts {
                        tokio::time::sleep(self.backoff.delay(attempt, retry_after)).await;
                    }
                }
                Err(_) => {
                    circuit.record_failure();
                    self.observer.on_attempt(operation, false, elapsed);
                    tracing::debug!(operation, attempt, "attempt timed out");
                    last_record = Some(self.timeout_record(operation));
                    if attempt < self.options.max_attempts {
                        tokio::time::sleep(self.backoff.delay(attempt, None)).await;
                    }
                }
            }
        }

        Err(last_record.unwrap_or_else(|| self.timeout_record(operation)))
    }

    fn circuit_open_record(&self, operation: &str, retry_after: Duration) -> ErrorRecord {
        ErrorRecord::new(
            StatusCode::CircuitOpen,
            format!("circuit open for {operation}"),
            ErrorContext::new(operation, "resilience").with_metadata(
                "retry_after_ms",
                serde_json::json!(retry_after.as_millis() as u64),
            ),
        )
    }

    fn timeout_record(&self, operation: &str) -> ErrorRecord {
        ErrorRecord::new(
            StatusCode::Timeout,
            format!(
                "operation {operation} exceeded {}ms",
                self.options.attempt_timeout.as_millis()
            ),
            ErrorContext::new(operation, "resilience"),
        )
    }
}

#[cfg(test)]
#[path = "middleware.test.rs"]
mod tests;
