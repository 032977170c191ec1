//! Multi-level health assessment.
//!
//! Five depths of checking, from "is the port open" (L1) to "is the data
//! on disk intact" (L5). The aggregate status is the worst level.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

/// Assessment depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    /// L1: connectivity (ports open, endpoints answering).
    Connectivity,
    /// L2: service (worker process and config present).
    Service,
    /// L3: performance (CPU, heap, latency percentiles vs baselines).
    Performance,
    /// L4: integration (chat API reachable, tool list nonempty, spool
    /// writable).
    Integration,
    /// L5: data integrity (spool readable, recent records well-formed).
    DataIntegrity,
}

impl HealthLevel {
    /// Short tag (`L1`..`L5`).
    pub fn tag(&self) -> &'static str {
        match self {
            HealthLevel::Connectivity => "L1",
            HealthLevel::Service => "L2",
            HealthLevel::Performance => "L3",
            HealthLevel::Integration => "L4",
            HealthLevel::DataIntegrity => "L5",
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Get the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Report from one check.
#[derive(Debug, Clone, Serialize)]
pub struct LevelReport {
    /// Check name.
    pub name: String,
    /// Assessment depth.
    pub level: HealthLevel,
    /// Outcome.
    pub status: HealthStatus,
    /// Free-form detail map.
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl LevelReport {
    /// A healthy report with no details.
    pub fn healthy(name: impl Into<String>, level: HealthLevel) -> Self {
        Self {
            name: name.into(),
            level,
            status: HealthStatus::Healthy,
            details: serde_json::Map::new(),
        }
    }

    /// Set the status.
    pub fn with_status(mut self, status: HealthStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// One health check.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Check name.
    fn name(&self) -> &str;
    /// Assessment depth this check belongs to.
    fn level(&self) -> HealthLevel;
    /// Run the check.
    async fn run(&self) -> LevelReport;
}

/// Aggregate assessment across all registered checks.
#[derive(Debug, Clone, Serialize)]
pub struct OverallHealth {
    /// Worst status among all reports.
    pub status: HealthStatus,
    /// Individual reports, ordered by level.
    pub reports: Vec<LevelReport>,
    /// When the assessment ran.
    pub checked_at: DateTime<Utc>,
}

/// Registry of health checks.
#[derive(Default)]
pub struct HealthRegistry {
    checks: Vec<std::sync::Arc<dyn HealthCheck>>,
}

impl HealthRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check.
    pub fn register(&mut self, check: std::sync::Arc<dyn HealthCheck>) {
        self.checks.push(check);
    }

    /// Run every check; the aggregate is the worst individual status.
    pub async fn assess(&self) -> OverallHealth {
        let mut reports = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let report = check.run().await;
            tracing::debug!(
                check = %report.name,
                level = report.level.tag(),
                status = report.status.as_str(),
                "health check"
            );
            reports.push(report);
        }
        reports.sort_by_key(|r| r.level);
        let status = reports
            .iter()
            .map(|r| r.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        OverallHealth {
            status,
            reports,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "check.test.rs"]
mod tests;
