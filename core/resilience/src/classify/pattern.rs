//! Classification rules as data, not types.
//!
//! Each [`ErrorPattern`] declares weighted matchers over the fields of an
//! [`ErrorRecord`]. The pattern with the highest normalized score wins;
//! its verdict (category, severity, retryability, strategy) overrides the
//! record's own declared fields.

use coderelay_error::ErrorCategory;
use coderelay_error::ErrorRecord;
use coderelay_error::RecoveryStrategy;
use coderelay_error::Severity;
use coderelay_error::StatusCode;

/// A single field matcher.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact status code.
    Code(StatusCode),
    /// Category of the status code.
    Category(ErrorCategory),
    /// Case-insensitive message substring.
    MessageContains(String),
    /// Message regex.
    MessageRegex(regex::Regex),
    /// Presence of a metadata key.
    MetadataKey(String),
    /// Originating component.
    Component(String),
    /// Operation being performed.
    Operation(String),
}

impl Matcher {
    /// Whether this matcher matches the record.
    pub fn matches(&self, record: &ErrorRecord) -> bool {
        match self {
            Matcher::Code(code) => record.code == *code,
            Matcher::Category(category) => record.category == *category,
            Matcher::MessageContains(needle) => record
                .message
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Matcher::MessageRegex(re) => re.is_match(&record.message),
            Matcher::MetadataKey(key) => record.context.metadata.contains_key(key),
            Matcher::Component(component) => record.context.component == *component,
            Matcher::Operation(operation) => record.context.operation == *operation,
        }
    }
}

/// A matcher with its weight.
#[derive(Debug, Clone)]
pub struct WeightedMatcher {
    pub matcher: Matcher,
    pub weight: f64,
}

/// The verdict a pattern assigns when it wins.
#[derive(Debug, Clone)]
pub struct PatternVerdict {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub retryable: bool,
    pub strategy: RecoveryStrategy,
    pub max_attempts: u32,
}

/// One classification rule.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    /// Stable pattern id, used in statistics.
    pub id: String,
    /// Weighted matchers; the score is matched weight over total weight.
    pub matchers: Vec<WeightedMatcher>,
    /// Verdict applied when this pattern wins.
    pub verdict: PatternVerdict,
}

impl ErrorPattern {
    /// Normalized match score in [0, 1]; 0 when nothing matched.
    pub fn score(&self, record: &ErrorRecord) -> f64 {
        let total: f64 = self.matchers.iter().map(|m| m.weight).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let matched: f64 = self
            .matchers
            .iter()
            .filter(|m| m.matcher.matches(record))
            .map(|m| m.weight)
            .sum();
        matched / total
    }
}

/// Builder for one pattern, in table-definition style.
pub struct PatternBuilder {
    id: String,
    matchers: Vec<WeightedMatcher>,
    verdict: PatternVerdict,
}

impl PatternBuilder {
    /// Start a pattern with a default verdict.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            matchers: Vec::new(),
            verdict: PatternVerdict {
                category: ErrorCategory::Unknown,
                severity: Severity::Medium,
                retryable: false,
                strategy: RecoveryStrategy::Manual,
                max_attempts: 1,
            },
        }
    }

    /// Add a matcher with weight.
    pub fn when(mut self, matcher: Matcher, weight: f64) -> Self {
        self.matchers.push(WeightedMatcher { matcher, weight });
        self
    }

    /// Set the verdict.
    pub fn then(
        mut self,
        category: ErrorCategory,
        severity: Severity,
        retryable: bool,
        strategy: RecoveryStrategy,
        max_attempts: u32,
    ) -> Self {
        self.verdict = PatternVerdict {
            category,
            severity,
            retryable,
            strategy,
            max_attempts,
        };
        self
    }

    /// Finish the pattern.
    pub fn build(self) -> ErrorPattern {
        ErrorPattern {
            id: self.id,
            matchers: self.matchers,
            verdict: self.verdict,
        }
    }
}

/// The built-in rule table.
///
/// Order is irrelevant; scoring decides. Weights favor exact status codes
/// over fuzzy message matches.
pub fn default_patterns() -> Vec<ErrorPattern> {
    use ErrorCategory::*;
    use RecoveryStrategy::*;

    vec![
        PatternBuilder::new("chat_rate_limit")
            .when(Matcher::Code(StatusCode::ChatRateLimited), 3.0)
            .when(Matcher::MessageContains("rate limit".to_string()), 1.0)
            .then(Chat, Severity::Low, true, Retry, 5)
            .build(),
        PatternBuilder::new("chat_send_failure")
            .when(Matcher::Code(StatusCode::ChatSendFailed), 3.0)
            .when(Matcher::Operation("chat_send".to_string()), 1.0)
            .then(Chat, Severity::Medium, true, Retry, 3)
            .build(),
        PatternBuilder::new("network_transient")
            .when(Matcher::Category(Network), 2.0)
            .when(Matcher::MessageContains("connection".to_string()), 1.0)
            .then(Network, Severity::Low, true, Retry, 3)
            .build(),
        PatternBuilder::new("bridge_down")
            .when(Matcher::Code(StatusCode::BridgeNotRunning), 3.0)
            .when(Matcher::Code(StatusCode::BridgeHealthFailed), 2.0)
            .when(Matcher::Component("bridge".to_string()), 1.0)
            .then(Bridge, Severity::High, true, Restart, 3)
            .build(),
        PatternBuilder::new("bridge_slow_start")
            .when(Matcher::Code(StatusCode::StartupTimeout), 3.0)
            .then(Bridge, Severity::Medium, true, Retry, 2)
            .build(),
        PatternBuilder::new("validation")
            .when(Matcher::Category(Validation), 3.0)
            .then(Validation, Severity::Low, false, Ignore, 1)
            .build(),
        PatternBuilder::new("filesystem_permission")
            .when(Matcher::Code(StatusCode::FilePermissionDenied), 3.0)
            .when(Matcher::MessageContains("permission denied".to_string()), 1.0)
            .then(Filesystem, Severity::High, false, Escalate, 1)
            .build(),
        PatternBuilder::new("filesystem_space")
            .when(Matcher::Code(StatusCode::FileSpaceExhausted), 3.0)
            .when(Matcher::MessageContains("no space".to_string()), 1.0)
            .then(Filesystem, Severity::Critical, false, GracefulDegradation, 1)
            .build(),
        PatternBuilder::new("spool_integrity")
            .when(Matcher::Code(StatusCode::IntegrityError), 3.0)
            .then(Filesystem, Severity::Critical, false, Escalate, 1)
            .build(),
        PatternBuilder::new("auth_rejected")
            .when(Matcher::Category(Security), 2.0)
            .then(Security, Severity::High, false, Manual, 1)
            .build(),
        PatternBuilder::new("resource_pressure")
            .when(Matcher::Code(StatusCode::Backpressure), 2.0)
            .when(Matcher::Code(StatusCode::ResourcesExhausted), 2.0)
            .when(Matcher::Code(StatusCode::MemoryLimit), 2.0)
            .then(Resource, Severity::High, true, GracefulDegradation, 2)
            .build(),
        PatternBuilder::new("remote_server_error")
            .when(Matcher::Code(StatusCode::RemoteServerError), 3.0)
            .when(Matcher::MessageRegex(static_regex(r"\b5\d\d\b")), 1.0)
            .then(Network, Severity::Medium, true, CircuitBreaker, 3)
            .build(),
        PatternBuilder::new("timeout")
            .when(Matcher::Code(StatusCode::Timeout), 3.0)
            .when(Matcher::MessageContains("timed out".to_string()), 1.0)
            .then(Network, Severity::Medium, true, Retry, 3)
            .build(),
    ]
}

/// Compile a regex known valid at authoring time.
fn static_regex(pattern: &str) -> regex::Regex {
    regex::Regex::new(pattern)
        .unwrap_or_else(|e| panic!("invalid built-in pattern regex {pattern}: {e}"))
}

#[cfg(test)]
#[path = "pattern.test.rs"]
mod tests;
