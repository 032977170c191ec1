//! Error types for the dispatch pipeline.

use coderelay_error::ErrorExt;
use coderelay_error::StatusCode;
use snafu::Location;
use snafu::Snafu;

/// Dispatch errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum DispatchError {
    /// Event failed validation; never retried.
    #[snafu(display("Validation failed: {message}"))]
    Validation {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Serialized event exceeds the configured maximum.
    #[snafu(display("Event size {size} exceeds limit {limit}"))]
    SizeLimit {
        size: usize,
        limit: usize,
        #[snafu(implicit)]
        location: Location,
    },

    /// Dispatch queue is past its high-water mark.
    #[snafu(display("Backpressure: {queued} events queued for {target}"))]
    Backpressure {
        target: String,
        queued: usize,
        #[snafu(implicit)]
        location: Location,
    },

    /// The spool rejected the record.
    #[snafu(display("Spool error: {source}"))]
    Spool {
        source: coderelay_spool::SpoolError,
        #[snafu(implicit)]
        location: Location,
    },

    /// The pipeline is shutting down.
    #[snafu(display("Dispatch is shutting down"))]
    ShuttingDown {
        #[snafu(implicit)]
        location: Location,
    },
}

impl ErrorExt for DispatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Validation { .. } => StatusCode::ValidationFailed,
            DispatchError::SizeLimit { .. } => StatusCode::SizeLimitExceeded,
            DispatchError::Backpressure { .. } => StatusCode::Backpressure,
            DispatchError::Spool { source, .. } => source.status_code(),
            DispatchError::ShuttingDown { .. } => StatusCode::ShuttingDown,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
