//! Typed error records carried by value across component boundaries.
//!
//! Raw errors are converted into [`ErrorRecord`]s at the edges. The
//! classifier and the recovery orchestrator only ever see records, never
//! the originating error types. Classification rules live in a data table,
//! not in the error types themselves.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::ext::ErrorExt;
use crate::status_code::ErrorCategory;
use crate::status_code::StatusCode;

/// Error severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Get the severity as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// One level less severe, saturating at `Low`.
    pub fn lowered(&self) -> Self {
        match self {
            Severity::Critical => Severity::High,
            Severity::High => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// One level more severe, saturating at `Critical`.
    pub fn raised(&self) -> Self {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            _ => Severity::Critical,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery strategies a plan step can apply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Retry,
    CircuitBreaker,
    Fallback,
    Restart,
    GracefulDegradation,
    Escalate,
    Ignore,
    Manual,
}

impl RecoveryStrategy {
    /// Get the strategy as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStrategy::Retry => "retry",
            RecoveryStrategy::CircuitBreaker => "circuit_breaker",
            RecoveryStrategy::Fallback => "fallback",
            RecoveryStrategy::Restart => "restart",
            RecoveryStrategy::GracefulDegradation => "graceful_degradation",
            RecoveryStrategy::Escalate => "escalate",
            RecoveryStrategy::Ignore => "ignore",
            RecoveryStrategy::Manual => "manual",
        }
    }

    /// Whether this strategy only makes sense for retryable errors.
    pub fn requires_retryable(&self) -> bool {
        matches!(self, RecoveryStrategy::Retry | RecoveryStrategy::CircuitBreaker)
    }
}

impl std::fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where and during what an error occurred.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation that was being performed (e.g. `chat_send`).
    pub operation: String,
    /// Component reporting the error (e.g. `dispatch`).
    pub component: String,
    /// Correlation id linking the error to a request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Secret-free additional metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ErrorContext {
    /// Create a context for an operation within a component.
    pub fn new(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            component: component.into(),
            correlation_id: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a correlation id.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// One recorded recovery attempt against an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    /// Strategy that was applied.
    pub strategy: RecoveryStrategy,
    /// Attempt ordinal within its step, starting at 1.
    pub attempt: i32,
    /// Whether the attempt succeeded.
    pub succeeded: bool,
    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,
    /// Handler detail, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A classified error carried by value.
///
/// Invariant: a non-retryable record never carries `Retry` or
/// `CircuitBreaker` recovery hints; the constructor and setters strip them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Status code identifying the failure.
    pub code: StatusCode,
    /// Category, derived from the code unless a classifier overrides it.
    pub category: ErrorCategory,
    /// Severity of the failure.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Whether the failure may be retried.
    pub retryable: bool,
    /// Context in which the failure occurred.
    pub context: ErrorContext,
    /// Suggested recovery strategies, most preferred first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recovery_hints: Vec<RecoveryStrategy>,
    /// Recovery attempts recorded so far.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<RecoveryAttempt>,
}

impl ErrorRecord {
    /// Create a record from a status code with defaults from its metadata.
    pub fn new(code: StatusCode, message: impl Into<String>, context: ErrorContext) -> Self {
        let meta = code.meta();
        Self {
            code,
            category: meta.category,
            severity: default_severity(code),
            message: message.into(),
            retryable: meta.retryable,
            context,
            recovery_hints: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Create a record from any workspace error.
    pub fn from_error(err: &dyn ErrorExt, context: ErrorContext) -> Self {
        Self::new(err.status_code(), err.to_string(), context)
    }

    /// Override the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Override retryability, re-enforcing the hint invariant.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self.enforce_hint_invariant();
        self
    }

    /// Set the recovery hints, dropping any that violate the invariant.
    pub fn with_recovery_hints(mut self, hints: Vec<RecoveryStrategy>) -> Self {
        self.recovery_hints = hints;
        self.enforce_hint_invariant();
        self
    }

    /// Record a recovery attempt.
    pub fn record_attempt(&mut self, attempt: RecoveryAttempt) {
        self.history.push(attempt);
    }

    /// Count of failed recovery attempts so far.
    pub fn failed_attempts(&self) -> usize {
        self.history.iter().filter(|a| !a.succeeded).count()
    }

    fn enforce_hint_invariant(&mut self) {
        if !self.retryable {
            self.recovery_hints.retain(|s| !s.requires_retryable());
        }
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({}/{})",
            self.code.name(),
            self.message,
            self.category,
            self.severity
        )
    }
}

/// Default severity for a status code.
///
/// Security, integrity and bridge-down failures start high; transient
/// network and rate-limit conditions start low.
fn default_severity(code: StatusCode) -> Severity {
    use StatusCode::*;
    match code {
        SecurityPolicyViolation | IntegrityError | FileSpaceExhausted | MemoryLimit => {
            Severity::Critical
        }
        BridgeNotRunning | SpawnFailed | Internal | ProcessingError | ChatUnauthorized
        | InvalidConfig | ConfigFileError | FilePermissionDenied | ResourcesExhausted => {
            Severity::High
        }
        BridgeHealthFailed | StartupTimeout | RemoteServerError | ChatSendFailed | IoError
        | Backpressure | DeadlineExceeded | AuthenticationFailed | AuthorizationFailed
        | AuthHeaderNotFound => Severity::Medium,
        _ => Severity::Low,
    }
}

#[cfg(test)]
#[path = "record.test.rs"]
mod tests;
