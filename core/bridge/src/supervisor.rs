//! Supervision of the external chat worker process.
//!
//! The worker is opaque: a child process plus an HTTP health endpoint.
//! The supervisor owns the only handle to it; everyone else reads status
//! through a watch-channel snapshot and never touches the process.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;
use coderelay_config::BridgeConfig;
use coderelay_resilience::CircuitBreaker;
use rand::Rng;
use serde::Serialize;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::BridgeError;
use crate::error::Result;
use crate::error::bridge_error;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Stopped,
    Starting,
    Running,
    Unhealthy,
    Failed,
}

impl WorkerState {
    /// Get the state as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Stopped => "stopped",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Unhealthy => "unhealthy",
            WorkerState::Failed => "failed",
        }
    }
}

/// Copy-on-write status snapshot served to readers.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeStatus {
    /// Lifecycle state.
    pub state: WorkerState,
    /// Worker pid, when running.
    pub pid: Option<u32>,
    /// When the worker last started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Restarts since process start.
    pub restarts: u32,
    /// Whether the last health poll succeeded.
    pub healthy: bool,
    /// When health was last polled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
}

impl BridgeStatus {
    fn stopped() -> Self {
        Self {
            state: WorkerState::Stopped,
            pid: None,
            started_at: None,
            restarts: 0,
            healthy: false,
            last_health_check: None,
        }
    }
}

struct Inner {
    child: Option<Child>,
    restarts: u32,
    restart_times: VecDeque<Instant>,
}

/// Starts, stops and health-checks the worker.
pub struct BridgeSupervisor {
    config: BridgeConfig,
    http: reqwest::Client,
    inner: Mutex<Inner>,
    status_tx: watch::Sender<BridgeStatus>,
    circuit: Arc<CircuitBreaker>,
    shutdown: CancellationToken,
}

impl BridgeSupervisor {
    /// Create a supervisor; nothing is started yet.
    pub fn new(config: BridgeConfig, circuit: Arc<CircuitBreaker>) -> Arc<Self> {
        let (status_tx, _) = watch::channel(BridgeStatus::stopped());
        Arc::new(Self {
            config,
            http: reqwest::Client::new(),
            inner: Mutex::new(Inner {
                child: None,
                restarts: 0,
                restart_times: VecDeque::new(),
            }),
            status_tx,
            circuit,
            shutdown: CancellationToken::new(),
        })
    }

    /// Subscribe to status snapshots.
    pub fn watch_status(&self) -> watch::Receiver<BridgeStatus> {
        self.status_tx.subscribe()
    }

    /// The circuit guarding this worker.
    pub fn circuit(&self) -> &Arc<CircuitBreaker> {
        &self.circuit
    }

    /// Current status snapshot.
    pub fn status(&self) -> BridgeStatus {
        self.status_tx.borrow().clone()
    }

    /// Start the worker and wait for its health endpoint to report ready.
    ///
    /// Fails with `AlreadyRunning` if a live worker exists and with
    /// `StartupTimeout` when the deadline expires; a timed-out worker is
    /// killed before returning.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(pid) = alive_pid(&mut inner.child) {
            return bridge_error::AlreadyRunningSnafu { pid }.fail();
        }

        self.publish(|s| {
            s.state = WorkerState::Starting;
            s.healthy = false;
        });

        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                self.publish(|s| s.state = WorkerState::Failed);
                bridge_error::SpawnSnafu {
                    command: self.config.command.clone(),
                    message: e.to_string(),
                }
                .build()
            })?;

        let pid = child.id();
        tracing::info!(pid, command = %self.config.command, "worker spawned");

        // Wait for ready within the startup deadline.
        let deadline = Duration::from_millis(self.config.startup_deadline_ms);
        let became_ready = tokio::time::timeout(deadline, async {
            loop {
                if self.health_ok().await {
                    return true;
                }
                // A child that exited during startup will never be ready.
                if child.try_wait().ok().flatten().is_some() {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match became_ready {
            Ok(true) => {
                inner.child = Some(child);
                self.publish(|s| {
                    s.state = WorkerState::Running;
                    s.pid = pid;
                    s.started_at = Some(Utc::now());
                    s.healthy = true;
                    s.last_health_check = Some(Utc::now());
                });
                Ok(())
            }
            Ok(false) | Err(_) => {
                let _ = child.start_kill();
                self.publish(|s| {
                    s.state = WorkerState::Failed;
                    s.pid = None;
                    s.healthy = false;
                });
                bridge_error::StartupTimeoutSnafu {
                    deadline_ms: self.config.startup_deadline_ms,
                }
                .fail()
            }
        }
    }

    /// Stop the worker, if running.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match inner.child.take() {
            Some(mut child) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                self.publish(|s| {
                    s.state = WorkerState::Stopped;
                    s.pid = None;
                    s.healthy = false;
                });
                tracing::info!("worker stopped");
                Ok(())
            }
            None => bridge_error::NotRunningSnafu.fail(),
        }
    }

    /// Restart the worker with backoff; a restart storm trips the bridge
    /// circuit.
    pub async fn restart(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            if let Some(mut child) = inner.child.take() {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }

            let now = Instant::now();
            inner.restart_times.push_back(now);
            let window = self.config.restart_backoff.window;
            while inner
                .restart_times
                .front()
                .is_some_and(|t| now.duration_since(*t) > window)
            {
                inner.restart_times.pop_front();
            }
            if inner.restart_times.len() as u32 > self.config.restart_backoff.max_restarts {
                self.circuit
                    .force_open(self.config.restart_backoff.window);
                self.publish(|s| s.state = WorkerState::Failed);
                return bridge_error::CircuitTrippedSnafu {
                    restarts: inner.restart_times.len() as u32,
                }
                .fail();
            }

            inner.restarts += 1;
            let restarts = inner.restarts;
            self.publish(|s| s.restarts = restarts);

            // Exponential backoff with jitter before the next spawn.
            let delay = restart_delay(&self.config, inner.restart_times.len() as u32);
            drop(inner);
            tracing::info!(delay_ms = delay.as_millis() as u64, "backing off before restart");
            tokio::time::sleep(delay).await;
        }
        self.start().await
    }

    /// Start the worker only when it is not already running and healthy.
    pub async fn ensure_running(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            if alive_pid(&mut inner.child).is_some() {
                return Ok(());
            }
        }
        match self.start().await {
            Ok(()) => Ok(()),
            // Lost the race with another caller; running is what we wanted.
            Err(BridgeError::AlreadyRunning { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Whether a live worker process exists right now.
    pub async fn check_process(&self) -> bool {
        let mut inner = self.inner.lock().await;
        alive_pid(&mut inner.child).is_some()
    }

    /// One health poll against the worker's endpoint.
    pub async fn health_ok(&self) -> bool {
        let poll = self
            .http
            .get(&self.config.health_endpoint)
            .timeout(Duration::from_millis(self.config.poll_interval_ms.max(500)))
            .send()
            .await;
        matches!(poll, Ok(resp) if resp.status().is_success())
    }

    /// Run the crash-detection poll loop until shutdown.
    ///
    /// Detects a crashed worker within one poll interval and marks the
    /// status accordingly; restart policy stays with the recovery layer.
    pub async fn run_poll_loop(self: Arc<Self>) {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => return,
                () = tokio::time::sleep(interval) => {}
            }

            let process_alive = self.check_process().await;
            if !process_alive {
                if self.status().state == WorkerState::Running {
                    tracing::warn!("worker process exited unexpectedly");
                    self.publish(|s| {
                        s.state = WorkerState::Failed;
                        s.pid = None;
                        s.healthy = false;
                    });
                }
                continue;
            }

            let healthy = self.health_ok().await;
            self.publish(|s| {
                s.healthy = healthy;
                s.last_health_check = Some(Utc::now());
                s.state = if healthy {
                    WorkerState::Running
                } else {
                    WorkerState::Unhealthy
                };
            });
        }
    }

    /// Stop the poll loop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn publish(&self, mutate: impl FnOnce(&mut BridgeStatus)) {
        self.status_tx.send_modify(mutate);
    }
}

/// Pid of the child if it is still alive.
fn alive_pid(child: &mut Option<Child>) -> Option<u32> {
    let c = child.as_mut()?;
    match c.try_wait() {
        // Exited (or unreadable): drop the handle.
        Ok(Some(_)) | Err(_) => {
            *child = None;
            None
        }
        Ok(None) => c.id(),
    }
}

/// Jittered exponential restart delay.
fn restart_delay(config: &BridgeConfig, attempt: u32) -> Duration {
    let backoff = &config.restart_backoff;
    let exp = attempt.saturating_sub(1).min(16);
    let ms = (backoff.base_ms as f64 * backoff.multiplier.powi(exp as i32))
        .min(backoff.max_ms as f64);
    let jittered = ms * rand::rng().random_range(0.8..1.2);
    Duration::from_millis(jittered as u64)
}

#[cfg(test)]
#[path = "supervisor.test.rs"]
mod tests;
