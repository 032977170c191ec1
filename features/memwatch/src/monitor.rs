//! Area-scoped memory monitoring.
//!
//! The monitor samples process memory plus per-area counts, applies the
//! configured thresholds and publishes alerts over a channel. It never
//! reaches into other components: cleanup is a signal, and whoever owns
//! the resource decides what to do with it.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;
use coderelay_config::MemoryConfig;
use coderelay_error::Severity;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::dumps::HeapDumpWriter;

/// Monitored areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryArea {
    Global,
    EventFiles,
    RateLimiter,
    BridgeCache,
    ConnectionPool,
    SecurityConfig,
}

impl MemoryArea {
    /// Get the area as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryArea::Global => "global",
            MemoryArea::EventFiles => "event_files",
            MemoryArea::RateLimiter => "rate_limiter",
            MemoryArea::BridgeCache => "bridge_cache",
            MemoryArea::ConnectionPool => "connection_pool",
            MemoryArea::SecurityConfig => "security_config",
        }
    }
}

/// Alert kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ThresholdBreach,
    GrowthRate,
    FileAccumulation,
    GcPressure,
}

/// One snapshot of one area.
#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    /// Area sampled.
    pub area: MemoryArea,
    /// Process heap estimate in bytes.
    pub heap_bytes: u64,
    /// Resident set size in bytes.
    pub resident_bytes: u64,
    /// Area-specific object/file count, when a probe is registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Sample time.
    pub timestamp: DateTime<Utc>,
}

/// An emitted alert.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryAlert {
    /// Alert classification.
    pub kind: AlertKind,
    /// Area that breached.
    pub area: MemoryArea,
    /// Severity of the breach.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// What an operator (or the cleanup hook) should do.
    pub recommended_actions: Vec<String>,
    /// Heap dump path, when one was written for this alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heap_dump: Option<String>,
    /// When the alert fired.
    pub timestamp: DateTime<Utc>,
}

/// Request for the spool owner to reclaim space.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupRequest {
    /// Area that needs attention.
    pub area: MemoryArea,
    /// The alert that triggered the request.
    pub kind: AlertKind,
}

/// Memory reading supplied per tick.
///
/// Production readings come from `sysinfo`; tests fabricate them.
#[derive(Debug, Clone, Copy)]
pub struct MemoryReading {
    pub heap_bytes: u64,
    pub resident_bytes: u64,
}

/// Source of process memory readings.
pub trait MemorySource: Send + Sync {
    /// Current process memory.
    fn read(&self) -> MemoryReading;
}

/// `sysinfo`-backed readings of the current process.
pub struct ProcessMemorySource {
    system: Mutex<sysinfo::System>,
    pid: sysinfo::Pid,
}

impl ProcessMemorySource {
    /// Create a source for this process.
    pub fn current() -> Self {
        Self {
            system: Mutex::new(sysinfo::System::new()),
            pid: sysinfo::Pid::from_u32(std::process::id()),
        }
    }
}

impl MemorySource for ProcessMemorySource {
    fn read(&self) -> MemoryReading {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[self.pid]), true);
        match system.process(self.pid) {
            Some(process) => MemoryReading {
                heap_bytes: process.memory(),
                resident_bytes: process.memory(),
            },
            None => MemoryReading {
                heap_bytes: 0,
                resident_bytes: 0,
            },
        }
    }
}

/// Count probe for one area (spooled file count, cache entries, ...).
pub type CountProbe = Arc<dyn Fn() -> u64 + Send + Sync>;

struct MonitorState {
    /// Last alert instant per (kind, area), for the cooldown.
    cooldowns: HashMap<(AlertKind, MemoryArea), Instant>,
    /// Recent (instant, heap bytes) for the growth-rate window.
    history: VecDeque<(Instant, u64)>,
}

/// The monitor.
pub struct MemoryMonitor {
    config: MemoryConfig,
    source: Arc<dyn MemorySource>,
    probes: HashMap<MemoryArea, CountProbe>,
    dumps: Option<HeapDumpWriter>,
    alerts_tx: broadcast::Sender<MemoryAlert>,
    cleanup_tx: broadcast::Sender<CleanupRequest>,
    state: Mutex<MonitorState>,
}

impl MemoryMonitor {
    /// Create a monitor.
    pub fn new(config: MemoryConfig, source: Arc<dyn MemorySource>) -> Self {
        let (alerts_tx, _) = broadcast::channel(64);
        let (cleanup_tx, _) = broadcast::channel(16);
        Self {
            config,
            source,
            probes: HashMap::new(),
            dumps: None,
            alerts_tx,
            cleanup_tx,
            state: Mutex::new(MonitorState {
                cooldowns: HashMap::new(),
                history: VecDeque::new(),
            }),
        }
    }

    /// Register a count probe for an area.
    pub fn with_probe(mut self, area: MemoryArea, probe: CountProbe) -> Self {
        self.probes.insert(area, probe);
        self
    }

    /// Enable heap dump capture.
    pub fn with_heap_dumps(mut self, dumps: HeapDumpWriter) -> Self {
        self.dumps = Some(dumps);
        self
    }

    /// Subscribe to alerts.
    pub fn alerts(&self) -> broadcast::Receiver<MemoryAlert> {
        self.alerts_tx.subscribe()
    }

    /// Subscribe to cleanup requests.
    pub fn cleanup_requests(&self) -> broadcast::Receiver<CleanupRequest> {
        self.cleanup_tx.subscribe()
    }

    /// Take one snapshot per area.
    pub fn snapshot_all(&self) -> Vec<MemorySnapshot> {
        let reading = self.source.read();
        let now = Utc::now();
        let mut out = Vec::new();
        for area in [
            MemoryArea::Global,
            MemoryArea::EventFiles,
            MemoryArea::RateLimiter,
            MemoryArea::BridgeCache,
            MemoryArea::ConnectionPool,
            MemoryArea::SecurityConfig,
        ] {
            out.push(MemorySnapshot {
                area,
                heap_bytes: reading.heap_bytes,
                resident_bytes: reading.resident_bytes,
                count: self.probes.get(&area).map(|p| p()),
                timestamp: now,
            });
        }
        out
    }

    /// Evaluate thresholds once; emits alerts and cleanup requests.
    ///
    /// Returns the alerts emitted this tick (suppressed ones excluded).
    pub fn tick(&self) -> Vec<MemoryAlert> {
        let reading = self.source.read();
        let heap_mb = reading.heap_bytes as f64 / (1024.0 * 1024.0);
        let mut emitted = Vec::new();

        // Record history for the growth-rate window (last 5 minutes).
        {
            let mut state = self.lock();
            let now = Instant::now();
            state.history.push_back((now, reading.heap_bytes));
            while state
                .history
                .front()
                .is_some_and(|(t, _)| now.duration_since(*t) > Duration::from_secs(300))
            {
                state.history.pop_front();
            }
        }

        // Hard heap cap.
        if heap_mb > self.config.max_heap_mb as f64 {
            if let Some(alert) = self.emit(
                AlertKind::ThresholdBreach,
                MemoryArea::Global,
                Severity::Critical,
                format!(
                    "heap {heap_mb:.1} MiB over cap {} MiB",
                    self.config.max_heap_mb
                ),
                vec![
                    "prune spooled events".to_string(),
                    "pause low-priority intake".to_string(),
                ],
            ) {
                emitted.push(alert);
            }
        }

        // Growth rate over the observed window.
        if let Some(rate) = self.growth_mb_per_min() {
            if rate > self.config.growth_mb_per_min {
                if let Some(alert) = self.emit(
                    AlertKind::GrowthRate,
                    MemoryArea::Global,
                    Severity::High,
                    format!(
                        "heap growing {rate:.1} MiB/min, threshold {:.1}",
                        self.config.growth_mb_per_min
                    ),
                    vec!["capture heap dump".to_string()],
                ) {
                    emitted.push(alert);
                }
            }
        }

        // Area-specific: spooled file accumulation.
        if let Some(probe) = self.probes.get(&MemoryArea::EventFiles) {
            let files = probe();
            if files as usize > self.config.max_spool_files {
                if let Some(alert) = self.emit(
                    AlertKind::FileAccumulation,
                    MemoryArea::EventFiles,
                    Severity::High,
                    format!(
                        "{files} spooled files over cap {}",
                        self.config.max_spool_files
                    ),
                    vec!["prune acked spool records".to_string()],
                ) {
                    emitted.push(alert);
                }
            }
        }

        emitted
    }

    /// Run the periodic loop until the receiver side goes away.
    pub async fn run_loop(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let interval = Duration::from_millis(self.config.snapshot_ms.max(100));
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                () = tokio::time::sleep(interval) => {
                    let _ = self.tick();
                }
            }
        }
    }

    /// Emit one alert unless the (kind, area) pair is cooling down.
    fn emit(
        &self,
        kind: AlertKind,
        area: MemoryArea,
        severity: Severity,
        message: String,
        recommended_actions: Vec<String>,
    ) -> Option<MemoryAlert> {
        {
            let mut state = self.lock();
            let now = Instant::now();
            if let Some(last) = state.cooldowns.get(&(kind, area)) {
                if now.duration_since(*last) < self.config.alert_cooldown {
                    tracing::debug!(
                        kind = ?kind,
                        area = area.as_str(),
                        "alert suppressed by cooldown"
                    );
                    return None;
                }
            }
            state.cooldowns.insert((kind, area), now);
        }

        let heap_dump = self
            .dumps
            .as_ref()
            .and_then(|d| d.write(area, &message).ok())
            .map(|p| p.display().to_string());

        let alert = MemoryAlert {
            kind,
            area,
            severity,
            message,
            recommended_actions,
            heap_dump,
            timestamp: Utc::now(),
        };
        tracing::warn!(
            kind = ?alert.kind,
            area = alert.area.as_str(),
            severity = %alert.severity,
            "{}",
            alert.message
        );

        let _ = self.cleanup_tx.send(CleanupRequest { area, kind });
        let _ = self.alerts_tx.send(alert.clone());
        Some(alert)
    }

    /// Growth rate over the recorded window, MiB per minute.
    fn growth_mb_per_min(&self) -> Option<f64> {
        let state = self.lock();
        let (first_t, first_v) = state.history.front()?;
        let (last_t, last_v) = state.history.back()?;
        let secs = last_t.duration_since(*first_t).as_secs_f64();
        if secs < 1.0 {
            return None;
        }
        let delta_mb = (*last_v as f64 - *first_v as f64) / (1024.0 * 1024.0);
        Some(delta_mb / (secs / 60.0))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "monitor.test.rs"]
mod tests;
