//! Built-in health checks.
//!
//! Environment-specific facts (is the worker alive, how hot is the CPU,
//! how many tools are registered) come in as probe closures wired by the
//! binary; the disk-facing L5 check reads the spool directly.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::check::HealthCheck;
use crate::check::HealthLevel;
use crate::check::HealthStatus;
use crate::check::LevelReport;

/// Boolean probe supplied by the binary.
pub type BoolProbe = Arc<dyn Fn() -> bool + Send + Sync>;
/// Numeric probe supplied by the binary.
pub type NumProbe = Arc<dyn Fn() -> f64 + Send + Sync>;

/// L1: a TCP endpoint accepts connections.
pub struct PortCheck {
    name: String,
    addr: String,
}

impl PortCheck {
    /// Check that `addr` (host:port) accepts TCP connects.
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
        }
    }
}

#[async_trait]
impl HealthCheck for PortCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> HealthLevel {
        HealthLevel::Connectivity
    }

    async fn run(&self) -> LevelReport {
        let reachable = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            tokio::net::TcpStream::connect(&self.addr),
        )
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);

        let status = if reachable {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        LevelReport::healthy(self.name.clone(), HealthLevel::Connectivity)
            .with_status(status)
            .with_detail("addr", serde_json::json!(self.addr))
            .with_detail("reachable", serde_json::json!(reachable))
    }
}

/// A check built from a boolean probe.
pub struct ProbeCheck {
    name: String,
    level: HealthLevel,
    probe: BoolProbe,
    /// Status reported when the probe is false.
    on_false: HealthStatus,
}

impl ProbeCheck {
    /// Create a probe-backed check.
    pub fn new(
        name: impl Into<String>,
        level: HealthLevel,
        probe: BoolProbe,
        on_false: HealthStatus,
    ) -> Self {
        Self {
            name: name.into(),
            level,
            probe,
            on_false,
        }
    }
}

#[async_trait]
impl HealthCheck for ProbeCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> HealthLevel {
        self.level
    }

    async fn run(&self) -> LevelReport {
        let ok = (self.probe)();
        let status = if ok { HealthStatus::Healthy } else { self.on_false };
        LevelReport::healthy(self.name.clone(), self.level)
            .with_status(status)
            .with_detail("ok", serde_json::json!(ok))
    }
}

/// L3: a metric compared against a baseline.
pub struct BaselineCheck {
    name: String,
    probe: NumProbe,
    degraded_above: f64,
    unhealthy_above: f64,
}

impl BaselineCheck {
    /// Degrade above `degraded_above`, go unhealthy above
    /// `unhealthy_above`.
    pub fn new(
        name: impl Into<String>,
        probe: NumProbe,
        degraded_above: f64,
        unhealthy_above: f64,
    ) -> Self {
        Self {
            name: name.into(),
            probe,
            degraded_above,
            unhealthy_above,
        }
    }
}

#[async_trait]
impl HealthCheck for BaselineCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> HealthLevel {
        HealthLevel::Performance
    }

    async fn run(&self) -> LevelReport {
        let value = (self.probe)();
        let status = if value > self.unhealthy_above {
            HealthStatus::Unhealthy
        } else if value > self.degraded_above {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        LevelReport::healthy(self.name.clone(), HealthLevel::Performance)
            .with_status(status)
            .with_detail("value", serde_json::json!(value))
            .with_detail("degraded_above", serde_json::json!(self.degraded_above))
            .with_detail("unhealthy_above", serde_json::json!(self.unhealthy_above))
    }
}

/// L5: the spool is readable and recent records parse.
pub struct SpoolIntegrityCheck {
    dir: PathBuf,
}

impl SpoolIntegrityCheck {
    /// Check the spool rooted at `dir` (the events subtree).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl HealthCheck for SpoolIntegrityCheck {
    fn name(&self) -> &str {
        "spool_integrity"
    }

    fn level(&self) -> HealthLevel {
        HealthLevel::DataIntegrity
    }

    async fn run(&self) -> LevelReport {
        let report = LevelReport::healthy("spool_integrity", HealthLevel::DataIntegrity);

        if !self.dir.is_dir() {
            return report
                .with_status(HealthStatus::Unhealthy)
                .with_detail("error", serde_json::json!("spool directory missing"));
        }

        // Writable: create and remove a probe file.
        let probe = self.dir.join(".health-probe");
        let writable = std::fs::write(&probe, b"ok").is_ok();
        let _ = std::fs::remove_file(&probe);
        if !writable {
            return report
                .with_status(HealthStatus::Unhealthy)
                .with_detail("error", serde_json::json!("spool not writable"));
        }

        // Recent plain records must parse as JSON. Compressed records are
        // checksum-verified at read time, so a byte scan adds nothing.
        let mut malformed = 0usize;
        let mut scanned = 0usize;
        if let Ok(entries) = std::fs::read_dir(&self.dir) {
            let mut names: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|e| e == "json"))
                .collect();
            names.sort();
            for path in names.iter().rev().take(10) {
                if path.file_name().is_some_and(|n| n == "cursor.json") {
                    continue;
                }
                scanned += 1;
                let ok = std::fs::read(path)
                    .ok()
                    .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
                    .is_some();
                if !ok {
                    malformed += 1;
                }
            }
        }

        let status = if malformed > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        report
            .with_status(status)
            .with_detail("writable", serde_json::json!(true))
            .with_detail("recent_scanned", serde_json::json!(scanned))
            .with_detail("malformed", serde_json::json!(malformed))
    }
}

#[cfg(test)]
#[path = "checks.test.rs"]
mod tests;
