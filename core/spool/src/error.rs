//! Error types for spool operations.

use coderelay_error::ErrorExt;
use coderelay_error::StatusCode;
use snafu::Location;
use snafu::Snafu;

/// Spool errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum SpoolError {
    /// IO failure on the spool directory or a record file.
    #[snafu(display("IO error on {path}: {message}"))]
    Io {
        path: String,
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Stored checksum does not match the decompressed content.
    #[snafu(display("Checksum mismatch for {name}: stored {stored}, computed {computed}"))]
    Integrity {
        name: String,
        stored: String,
        computed: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Compressed record is missing its checksum header.
    #[snafu(display("Record {name} has no checksum header"))]
    MissingChecksum {
        name: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Record content failed to (de)serialize.
    #[snafu(display("Malformed record {name}: {message}"))]
    Malformed {
        name: String,
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Record id not present in the spool.
    #[snafu(display("Record not found: {id}"))]
    NotFound {
        id: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl ErrorExt for SpoolError {
    fn status_code(&self) -> StatusCode {
        match self {
            SpoolError::Io { .. } => StatusCode::IoError,
            SpoolError::Integrity { .. } => StatusCode::IntegrityError,
            SpoolError::MissingChecksum { .. } => StatusCode::IntegrityError,
            SpoolError::Malformed { .. } => StatusCode::ParseError,
            SpoolError::NotFound { .. } => StatusCode::FileNotFound,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub(crate) fn io_err(path: &std::path::Path, err: &std::io::Error) -> SpoolError {
    spool_error::IoSnafu {
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .build()
}

/// Result type for spool operations.
pub type Result<T> = std::result::Result<T, SpoolError>;
