//! Error helpers for the tool surface.

use coderelay_error::ErrorExt;
use coderelay_error::StatusCode;
use snafu::Location;
use snafu::Snafu;

/// Tool-surface errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum ToolError {
    /// Tool not found in registry.
    #[snafu(display("Tool not found: {name}"))]
    NotFound {
        name: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Invalid input for tool.
    #[snafu(display("Invalid input: {message}"))]
    InvalidInput {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Unknown read-only resource.
    #[snafu(display("Resource not found: {name}"))]
    ResourceNotFound {
        name: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl ErrorExt for ToolError {
    fn status_code(&self) -> StatusCode {
        match self {
            ToolError::NotFound { .. } => StatusCode::InvalidRequest,
            ToolError::InvalidInput { .. } => StatusCode::ValidationFailed,
            ToolError::ResourceNotFound { .. } => StatusCode::InvalidRequest,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Wrap a deserialization error as invalid input.
pub(crate) fn invalid_input(err: impl std::fmt::Display) -> ToolError {
    tool_error::InvalidInputSnafu {
        message: err.to_string(),
    }
    .build()
}
