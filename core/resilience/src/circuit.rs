//! Per-endpoint circuit breakers.
//!
//! State machine per named operation:
//!
//! ```text
//! closed --(threshold failures in window)--> open
//! open --(cool-down elapsed)--> half_open
//! half_open --(probe success)--> closed
//! half_open --(probe failure)--> open, cool-down doubled (capped)
//! ```
//!
//! While open, calls fail fast with `CircuitOpen` and the wrapped
//! operation is never invoked.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;
use coderelay_config::CircuitConfig;
use serde::Serialize;

/// Public circuit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Get the state as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Observable snapshot of one circuit.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    /// Circuit key (operation name).
    pub key: String,
    /// Current state.
    pub state: CircuitState,
    /// Failures recorded in the current window.
    pub failure_count: u32,
    /// Successes since the last transition.
    pub success_count: u32,
    /// When the circuit last changed state.
    pub last_transition: DateTime<Utc>,
    /// Configured failure threshold.
    pub failure_threshold: u32,
}

/// Outcome of asking a circuit for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Proceed with the call.
    Allowed,
    /// Proceed, but this is the single half-open probe.
    Probe,
    /// Rejected; retry after the given delay.
    Rejected { retry_after: Duration },
}

#[derive(Debug)]
enum Inner {
    Closed {
        /// Failure instants within the rolling window.
        failures: Vec<Instant>,
        successes: u32,
    },
    Open {
        until: Instant,
        cool_down: Duration,
    },
    HalfOpen {
        in_flight: bool,
        cool_down: Duration,
        successes: u32,
    },
}

#[derive(Debug)]
struct State {
    inner: Inner,
    last_transition: DateTime<Utc>,
}

impl State {
    fn transition(&mut self, inner: Inner) {
        self.inner = inner;
        self.last_transition = Utc::now();
    }
}

/// One circuit breaker.
pub struct CircuitBreaker {
    key: String,
    config: CircuitConfig,
    inner: Mutex<State>,
}

impl CircuitBreaker {
    /// Create a closed circuit for `key`.
    pub fn new(key: impl Into<String>, config: CircuitConfig) -> Self {
        Self {
            key: key.into(),
            config,
            inner: Mutex::new(State {
                inner: Inner::Closed {
                    failures: Vec::new(),
                    successes: 0,
                },
                last_transition: Utc::now(),
            }),
        }
    }

    /// Ask for admission. Open circuits transition to half-open once their
    /// cool-down has elapsed; only one probe is admitted at a time.
    pub fn admit(&self) -> Admission {
        let mut state = self.lock();
        let now = Instant::now();

        enum Decision {
            Allow,
            Probe { cool_down: Duration },
            Reject { retry_after: Duration },
            MarkProbe,
        }

        let decision = match &mut state.inner {
            Inner::Closed { .. } => Decision::Allow,
            Inner::Open { until, cool_down } => {
                if now >= *until {
                    Decision::Probe {
                        cool_down: *cool_down,
                    }
                } else {
                    Decision::Reject {
                        retry_after: until.duration_since(now),
                    }
                }
            }
            Inner::HalfOpen {
                in_flight,
                cool_down,
                ..
            } => {
                if *in_flight {
                    Decision::Reject {
                        retry_after: *cool_down,
                    }
                } else {
                    *in_flight = true;
                    Decision::MarkProbe
                }
            }
        };

        match decision {
            Decision::Allow => Admission::Allowed,
            Decision::Probe { cool_down } => {
                state.transition(Inner::HalfOpen {
                    in_flight: true,
                    cool_down,
                    successes: 0,
                });
                tracing::debug!(circuit = %self.key, "circuit half-open, admitting probe");
                Admission::Probe
            }
            Decision::MarkProbe => Admission::Probe,
            Decision::Reject { retry_after } => Admission::Rejected { retry_after },
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut state = self.lock();

        let close = match &mut state.inner {
            Inner::Closed { failures, successes } => {
                failures.clear();
                *successes = successes.saturating_add(1);
                false
            }
            Inner::HalfOpen {
                successes,
                in_flight,
                ..
            } => {
                *successes += 1;
                *in_flight = false;
                *successes >= self.config.half_open_probes
            }
            Inner::Open { .. } => false,
        };

        if close {
            tracing::info!(circuit = %self.key, "circuit closed after successful probe");
            state.transition(Inner::Closed {
                failures: Vec::new(),
                successes: 0,
            });
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut state = self.lock();
        let now = Instant::now();

        let open_for = match &mut state.inner {
            Inner::Closed { failures, .. } => {
                failures.push(now);
                failures.retain(|t| now.duration_since(*t) <= self.config.window);
                if failures.len() as u32 >= self.config.failure_threshold {
                    Some(self.config.cool_down)
                } else {
                    None
                }
            }
            // Failed probe: reopen for twice the previous cool-down.
            Inner::HalfOpen { cool_down, .. } => {
                Some((*cool_down * 2).min(self.config.max_cool_down))
            }
            Inner::Open { .. } => None,
        };

        if let Some(cool_down) = open_for {
            tracing::warn!(
                circuit = %self.key,
                cool_down_ms = cool_down.as_millis() as u64,
                "circuit opened"
            );
            state.transition(Inner::Open {
                until: now + cool_down,
                cool_down,
            });
        }
    }

    /// Force the circuit open for `cool_down` (used by the
    /// `circuit_breaker` recovery strategy).
    pub fn force_open(&self, cool_down: Duration) {
        let mut state = self.lock();
        tracing::warn!(
            circuit = %self.key,
            cool_down_ms = cool_down.as_millis() as u64,
            "circuit forced open"
        );
        state.transition(Inner::Open {
            until: Instant::now() + cool_down,
            cool_down,
        });
    }

    /// Current observable state.
    pub fn snapshot(&self) -> CircuitSnapshot {
        let state = self.lock();
        let (public, failure_count, success_count) = match &state.inner {
            Inner::Closed { failures, successes } => {
                (CircuitState::Closed, failures.len() as u32, *successes)
            }
            Inner::Open { .. } => (CircuitState::Open, self.config.failure_threshold, 0),
            Inner::HalfOpen { successes, .. } => (CircuitState::HalfOpen, 0, *successes),
        };
        CircuitSnapshot {
            key: self.key.clone(),
            state: public,
            failure_count,
            success_count,
            last_transition: state.last_transition,
            failure_threshold: self.config.failure_threshold,
        }
    }

    /// Current state tag.
    pub fn state(&self) -> CircuitState {
        self.snapshot().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Map of circuits keyed by operation name.
///
/// Per-key updates take that circuit's own lock; the map lock is only held
/// to resolve or insert a key, so readers never contend with call paths.
pub struct CircuitMap {
    config: CircuitConfig,
    circuits: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitMap {
    /// Create a map with shared thresholds.
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            config,
            circuits: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the circuit for `key`.
    pub fn get(&self, key: &str) -> Arc<CircuitBreaker> {
        if let Some(c) = self
            .circuits
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
        {
            return c.clone();
        }
        let mut map = self.circuits.write().unwrap_or_else(|e| e.into_inner());
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(key, self.config.clone())))
            .clone()
    }

    /// Snapshots of every known circuit.
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        self.circuits
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|c| c.snapshot())
            .collect()
    }
}

#[cfg(test)]
#[path = "circuit.test.rs"]
mod tests;
