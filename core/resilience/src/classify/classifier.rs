//! The error classifier.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use chrono::Utc;
use coderelay_error::ErrorCategory;
use coderelay_error::ErrorRecord;
use coderelay_error::RecoveryStrategy;
use coderelay_error::Severity;
use serde::Serialize;

use crate::classify::pattern::ErrorPattern;
use crate::classify::stats::ClassifierStats;
use crate::classify::stats::StatsSnapshot;

/// Tunables for frequency-driven severity adjustment.
///
/// The thresholds mirror the behavior this replaces: a pattern firing more
/// than `lower_severity_above` times within `frequency_window` is noise
/// and drops one severity level; one firing fewer than
/// `raise_severity_below` times with a medium base severity is unusual
/// enough to raise to high.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub lower_severity_above: u64,
    pub raise_severity_below: u64,
    pub frequency_window: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            lower_severity_above: 100,
            raise_severity_below: 5,
            frequency_window: Duration::from_secs(3600),
        }
    }
}

/// The classifier's verdict for one record.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// Winning pattern id, when any pattern scored above zero.
    pub pattern_id: Option<String>,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub retryable: bool,
    pub strategy: RecoveryStrategy,
    pub max_attempts: u32,
    /// Match score in [0, 1]; 0.5 for synthesized defaults.
    pub confidence: f64,
}

struct ClassifierState {
    stats: ClassifierStats,
    /// Fire instants per pattern, pruned to the frequency window.
    fires: HashMap<String, VecDeque<Instant>>,
}

/// Pattern-based error classifier with frequency-adjusted severity.
pub struct Classifier {
    patterns: Vec<ErrorPattern>,
    config: ClassifierConfig,
    state: Mutex<ClassifierState>,
}

impl Classifier {
    /// Create a classifier over a rule set.
    pub fn new(patterns: Vec<ErrorPattern>, config: ClassifierConfig) -> Self {
        Self {
            patterns,
            config,
            state: Mutex::new(ClassifierState {
                stats: ClassifierStats::new(),
                fires: HashMap::new(),
            }),
        }
    }

    /// Classifier over the built-in rule table.
    pub fn with_defaults() -> Self {
        Self::new(
            crate::classify::pattern::default_patterns(),
            ClassifierConfig::default(),
        )
    }

    /// Classify a record.
    ///
    /// The winning pattern's verdict is adopted wholesale; when nothing
    /// matches, defaults are synthesized from the record's own declared
    /// fields with confidence 0.5.
    pub fn classify(&self, record: &ErrorRecord) -> Classification {
        let best = self
            .patterns
            .iter()
            .map(|p| (p, p.score(record)))
            .filter(|(_, score)| *score > 0.0)
            .max_by(|(_, a), (_, b)| a.total_cmp(b));

        let mut classification = match best {
            Some((pattern, score)) => Classification {
                pattern_id: Some(pattern.id.clone()),
                category: pattern.verdict.category,
                severity: pattern.verdict.severity,
                retryable: pattern.verdict.retryable,
                strategy: pattern.verdict.strategy,
                max_attempts: pattern.verdict.max_attempts,
                confidence: score,
            },
            None => Classification {
                pattern_id: None,
                category: record.category,
                severity: record.severity,
                retryable: record.retryable,
                strategy: synthesized_strategy(record),
                max_attempts: 3,
                confidence: 0.5,
            },
        };

        let mut state = self.lock();
        if let Some(id) = classification.pattern_id.clone() {
            let fired = record_fire(
                &mut state.fires,
                &id,
                self.config.frequency_window,
            );
            classification.severity = self.adjust_severity(classification.severity, fired);
        }
        state.stats.record_classification(
            classification.category,
            classification.severity,
            classification.pattern_id.as_deref(),
            Utc::now(),
        );
        drop(state);

        tracing::debug!(
            pattern = classification.pattern_id.as_deref().unwrap_or("<none>"),
            category = %classification.category,
            severity = %classification.severity,
            confidence = classification.confidence,
            "classified error"
        );
        classification
    }

    /// Record the outcome of a recovery attempt for strategy statistics.
    pub fn record_outcome(&self, strategy: RecoveryStrategy, succeeded: bool) {
        self.lock().stats.record_outcome(strategy, succeeded);
    }

    /// Snapshot of the accumulated statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.lock().stats.snapshot()
    }

    /// Frequency-based adjustment: noisy patterns drop one level, rare
    /// medium-severity patterns rise to high.
    fn adjust_severity(&self, base: Severity, fires_in_window: u64) -> Severity {
        if fires_in_window > self.config.lower_severity_above {
            base.lowered()
        } else if fires_in_window < self.config.raise_severity_below && base == Severity::Medium {
            Severity::High
        } else {
            base
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClassifierState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Strategy synthesized for unmatched records.
fn synthesized_strategy(record: &ErrorRecord) -> RecoveryStrategy {
    if let Some(hint) = record.recovery_hints.first() {
        return *hint;
    }
    if record.retryable {
        RecoveryStrategy::Retry
    } else {
        RecoveryStrategy::Manual
    }
}

/// Record a pattern fire and return the number of fires in the window,
/// including this one.
fn record_fire(
    fires: &mut HashMap<String, VecDeque<Instant>>,
    pattern_id: &str,
    window: Duration,
) -> u64 {
    let now = Instant::now();
    let entry = fires.entry(pattern_id.to_string()).or_default();
    entry.push_back(now);
    while entry
        .front()
        .is_some_and(|t| now.duration_since(*t) > window)
    {
        entry.pop_front();
    }
    entry.len() as u64
}

#[cfg(test)]
#[path = "classifier.test.rs"]
mod tests;
