//! Error types for bridge supervision.

use coderelay_error::ErrorExt;
use coderelay_error::StatusCode;
use snafu::Location;
use snafu::Snafu;

/// Bridge supervisor errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum BridgeError {
    /// The worker process could not be spawned.
    #[snafu(display("Failed to spawn worker `{command}`: {message}"))]
    Spawn {
        command: String,
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// The worker did not report ready before the startup deadline.
    #[snafu(display("Worker not ready within {deadline_ms}ms"))]
    StartupTimeout {
        deadline_ms: u64,
        #[snafu(implicit)]
        location: Location,
    },

    /// A worker is already running.
    #[snafu(display("Worker already running (pid {pid})"))]
    AlreadyRunning {
        pid: u32,
        #[snafu(implicit)]
        location: Location,
    },

    /// No worker is running.
    #[snafu(display("Worker is not running"))]
    NotRunning {
        #[snafu(implicit)]
        location: Location,
    },

    /// Restart storm tripped the bridge circuit.
    #[snafu(display("Bridge circuit tripped after {restarts} restarts in window"))]
    CircuitTripped {
        restarts: u32,
        #[snafu(implicit)]
        location: Location,
    },

    /// The health endpoint reported failure.
    #[snafu(display("Health check failed: {message}"))]
    HealthFailed {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl ErrorExt for BridgeError {
    fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Spawn { .. } => StatusCode::SpawnFailed,
            BridgeError::StartupTimeout { .. } => StatusCode::StartupTimeout,
            BridgeError::AlreadyRunning { .. } => StatusCode::AlreadyRunning,
            BridgeError::NotRunning { .. } => StatusCode::BridgeNotRunning,
            BridgeError::CircuitTripped { .. } => StatusCode::CircuitOpen,
            BridgeError::HealthFailed { .. } => StatusCode::BridgeHealthFailed,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
