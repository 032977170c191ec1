//! Extension trait tying error types to their status codes.
//!
//! Every error enum in the workspace implements [`ErrorExt`] so that
//! component boundaries can convert any failure into its [`StatusCode`]
//! and, from there, into a classified [`ErrorRecord`](crate::ErrorRecord).

use std::error::Error;

use crate::status_code::StatusCode;

/// Extension trait for workspace errors.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// The status code of this error.
    fn status_code(&self) -> StatusCode;

    /// Whether this error is retryable, per its status code metadata.
    fn is_retryable(&self) -> bool {
        self.status_code().is_retryable()
    }

    /// A user-facing message for this error.
    ///
    /// Internal and unknown errors hide their details behind the numeric
    /// code; everything else shows the display message.
    fn output_msg(&self) -> String {
        match self.status_code() {
            StatusCode::Internal | StatusCode::Unknown => {
                format!("Internal error: {}", self.status_code() as i32)
            }
            _ => self.to_string(),
        }
    }

    /// Downcast support.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// A minimal error carrying only a message and a status code.
#[derive(Debug)]
pub struct PlainError {
    message: String,
    code: StatusCode,
}

impl PlainError {
    /// Create a new plain error.
    pub fn new(message: impl Into<String>, code: StatusCode) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

impl std::fmt::Display for PlainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for PlainError {}

impl ErrorExt for PlainError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// An external error wrapped with a status code.
#[derive(Debug)]
pub struct BoxedError {
    source: Box<dyn Error + Send + Sync>,
    code: StatusCode,
}

impl std::fmt::Display for BoxedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Error for BoxedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl ErrorExt for BoxedError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Wrap an arbitrary error with a status code.
pub fn boxed(err: impl Error + Send + Sync + 'static, code: StatusCode) -> BoxedError {
    BoxedError {
        source: Box::new(err),
        code,
    }
}

#[cfg(test)]
#[path = "ext.test.rs"]
mod tests;
