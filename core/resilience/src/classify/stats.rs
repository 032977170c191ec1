//! Classification and recovery statistics.
//!
//! Totals by category/severity/pattern, hourly trend buckets over a
//! rolling seven days, and an exponentially smoothed success rate per
//! recovery strategy.

use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::DateTime;
use chrono::Utc;
use coderelay_error::ErrorCategory;
use coderelay_error::RecoveryStrategy;
use coderelay_error::Severity;
use serde::Serialize;

/// Smoothing factor for strategy success rates.
const SMOOTHING_ALPHA: f64 = 0.2;
/// Hours retained in the trend ring.
const TREND_HOURS: usize = 7 * 24;

/// One hourly trend bucket.
#[derive(Debug, Clone, Serialize)]
pub struct TrendBucket {
    /// Start of the hour.
    pub hour: DateTime<Utc>,
    /// Errors classified within that hour.
    pub count: u64,
}

/// Smoothed success rate for one strategy.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StrategyRate {
    /// Exponentially smoothed success rate in [0, 1].
    pub rate: f64,
    /// Outcomes observed.
    pub samples: u64,
}

/// Mutable statistics store.
#[derive(Debug, Default)]
pub struct ClassifierStats {
    by_category: HashMap<ErrorCategory, u64>,
    by_severity: HashMap<Severity, u64>,
    by_pattern: HashMap<String, u64>,
    trend: VecDeque<TrendBucket>,
    strategy_rates: HashMap<RecoveryStrategy, StrategyRate>,
    total: u64,
}

/// Read-only snapshot for exporters and the dashboard resource.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub by_category: HashMap<ErrorCategory, u64>,
    pub by_severity: HashMap<Severity, u64>,
    pub by_pattern: HashMap<String, u64>,
    pub trend: Vec<TrendBucket>,
    pub strategy_rates: HashMap<RecoveryStrategy, StrategyRate>,
}

impl ClassifierStats {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classification.
    pub fn record_classification(
        &mut self,
        category: ErrorCategory,
        severity: Severity,
        pattern_id: Option<&str>,
        at: DateTime<Utc>,
    ) {
        self.total += 1;
        *self.by_category.entry(category).or_default() += 1;
        *self.by_severity.entry(severity).or_default() += 1;
        if let Some(id) = pattern_id {
            *self.by_pattern.entry(id.to_string()).or_default() += 1;
        }
        self.bump_trend(at);
    }

    /// Record a recovery outcome, updating the smoothed strategy rate.
    pub fn record_outcome(&mut self, strategy: RecoveryStrategy, succeeded: bool) {
        let entry = self.strategy_rates.entry(strategy).or_insert(StrategyRate {
            rate: if succeeded { 1.0 } else { 0.0 },
            samples: 0,
        });
        if entry.samples > 0 {
            let observed = if succeeded { 1.0 } else { 0.0 };
            entry.rate = SMOOTHING_ALPHA * observed + (1.0 - SMOOTHING_ALPHA) * entry.rate;
        }
        entry.samples += 1;
    }

    /// Smoothed success rate for a strategy, if any outcome was seen.
    pub fn strategy_rate(&self, strategy: RecoveryStrategy) -> Option<StrategyRate> {
        self.strategy_rates.get(&strategy).copied()
    }

    /// Fires recorded for a pattern.
    pub fn pattern_count(&self, pattern_id: &str) -> u64 {
        self.by_pattern.get(pattern_id).copied().unwrap_or(0)
    }

    /// Take a snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total,
            by_category: self.by_category.clone(),
            by_severity: self.by_severity.clone(),
            by_pattern: self.by_pattern.clone(),
            trend: self.trend.iter().cloned().collect(),
            strategy_rates: self.strategy_rates.clone(),
        }
    }

    fn bump_trend(&mut self, at: DateTime<Utc>) {
        use chrono::DurationRound;
        let hour = at
            .duration_trunc(chrono::Duration::hours(1))
            .unwrap_or(at);

        match self.trend.back_mut() {
            Some(bucket) if bucket.hour == hour => bucket.count += 1,
            _ => {
                self.trend.push_back(TrendBucket { hour, count: 1 });
                while self.trend.len() > TREND_HOURS {
                    self.trend.pop_front();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "stats.test.rs"]
mod tests;
