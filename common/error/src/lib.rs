//! coderelay-error - Error taxonomy shared across the workspace.
//!
//! Provides three layers:
//! - [`StatusCode`]: a flat table of failure codes with
//!   `{retryable, log_error, category}` metadata.
//! - [`ErrorExt`]: the trait every crate-level error implements so
//!   boundaries can read its status code.
//! - [`ErrorRecord`]: the classified, carried-by-value error consumed by
//!   the classifier and the recovery orchestrator.

mod ext;
mod record;
mod status_code;

pub use ext::BoxedError;
pub use ext::ErrorExt;
pub use ext::PlainError;
pub use ext::boxed;
pub use record::ErrorContext;
pub use record::ErrorRecord;
pub use record::RecoveryAttempt;
pub use record::RecoveryStrategy;
pub use record::Severity;
pub use status_code::ErrorCategory;
pub use status_code::StatusCode;
pub use status_code::StatusMeta;
