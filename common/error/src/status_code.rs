//! Unified status codes for error classification.
//!
//! Status code format: XX_YYY (5-digit)
//! - XX = Category (00-99)
//! - YYY = Code within category (000-999)
//!
//! Category layout:
//! - General/Core (01-05): System, Validation, Filesystem, Network, Security
//! - Bridge domain (10-13): Configuration, Bridge, Resource, Chat

use strum::AsRefStr;
use strum::EnumIter;
use strum::FromRepr;
use strum::IntoStaticStr;

/// Status code metadata.
#[derive(Debug, Clone, Copy)]
pub struct StatusMeta {
    pub retryable: bool,
    pub log_error: bool,
    pub category: ErrorCategory,
}

/// Error category for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    // ====== General/Core (00-05) ======
    /// Success (00_xxx)
    Success,
    /// System/internal errors (01_xxx)
    System,
    /// Input validation errors (02_xxx)
    Validation,
    /// Filesystem errors (03_xxx)
    Filesystem,
    /// Network/transport errors (04_xxx)
    Network,
    /// Authentication/authorization/policy errors (05_xxx)
    Security,

    // ====== Bridge domain (10-13) ======
    /// Configuration errors (10_xxx)
    Configuration,
    /// Bridge worker lifecycle errors (11_xxx)
    Bridge,
    /// Resource limit errors (12_xxx)
    Resource,
    /// Chat platform errors (13_xxx)
    Chat,

    /// Unclassifiable errors.
    Unknown,
}

impl ErrorCategory {
    /// Get the category as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Success => "success",
            ErrorCategory::System => "system",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Filesystem => "filesystem",
            ErrorCategory::Network => "network",
            ErrorCategory::Security => "security",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Bridge => "bridge",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Chat => "chat",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

macro_rules! define_status_codes {
    ($(
        $(#[$attr:meta])*
        $name:ident = $value:expr => {
            retryable: $retry:expr,
            log_error: $log:expr,
            category: $cat:ident $(,)?
        }
    ),* $(,)?) => {
        /// Status codes for error classification.
        ///
        /// Format: XX_YYY (5-digit)
        /// - XX = Category (00-99)
        /// - YYY = Code within category (000-999)
        ///
        /// Ranges:
        /// - 00_000: Success
        /// - 01_xxx: System errors
        /// - 02_xxx: Validation errors
        /// - 03_xxx: Filesystem errors
        /// - 04_xxx: Network/Transport errors
        /// - 05_xxx: Security errors
        /// - 10_xxx: Configuration errors
        /// - 11_xxx: Bridge lifecycle errors
        /// - 12_xxx: Resource/Limit errors
        /// - 13_xxx: Chat platform errors
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            AsRefStr,
            EnumIter,
            FromRepr,
            IntoStaticStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        #[repr(i32)]
        pub enum StatusCode {
            $($(#[$attr])* $name = $value,)*
        }

        impl StatusCode {
            /// Returns the metadata for this status code.
            pub const fn meta(&self) -> StatusMeta {
                match self {
                    $(Self::$name => StatusMeta {
                        retryable: $retry,
                        log_error: $log,
                        category: ErrorCategory::$cat,
                    },)*
                }
            }

            /// Returns the string name of this status code.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)*
                }
            }
        }

        // Compile-time check for duplicate status code values
        const _: () = {
            const CODES: &[i32] = &[$($value),*];
            const fn check_unique() {
                let mut i = 0;
                while i < CODES.len() {
                    let mut j = i + 1;
                    while j < CODES.len() {
                        if CODES[i] == CODES[j] {
                            panic!("Duplicate status code value detected");
                        }
                        j += 1;
                    }
                    i += 1;
                }
            }
            check_unique();
        };
    };
}

define_status_codes! {
    // ====== Success (00_xxx) ======
    /// Operation succeeded.
    Success = 00_000 => { retryable: false, log_error: false, category: Success },

    // ====== System errors (01_xxx) ======
    /// Unknown error.
    Unknown = 01_000 => { retryable: false, log_error: true, category: Unknown },
    /// Internal error, unexpected BUG.
    Internal = 01_001 => { retryable: true, log_error: true, category: System },
    /// Task was cancelled.
    Cancelled = 01_002 => { retryable: false, log_error: false, category: System },
    /// Unrecoverable processing fault.
    ProcessingError = 01_003 => { retryable: false, log_error: true, category: System },
    /// Shutdown in progress, request refused.
    ShuttingDown = 01_004 => { retryable: false, log_error: false, category: System },

    // ====== Validation errors (02_xxx) ======
    /// Input failed schema or bounds validation.
    ValidationFailed = 02_000 => { retryable: false, log_error: false, category: Validation },
    /// Invalid request format.
    InvalidRequest = 02_001 => { retryable: false, log_error: false, category: Validation },
    /// Parse/Deserialize error.
    ParseError = 02_002 => { retryable: false, log_error: false, category: Validation },
    /// Serialized payload exceeds the configured size limit.
    SizeLimitExceeded = 02_003 => { retryable: false, log_error: false, category: Validation },
    /// Unknown event type tag.
    UnknownEventType = 02_004 => { retryable: false, log_error: false, category: Validation },

    // ====== Filesystem errors (03_xxx) ======
    /// IO error.
    IoError = 03_000 => { retryable: false, log_error: true, category: Filesystem },
    /// File or directory not found.
    FileNotFound = 03_001 => { retryable: false, log_error: false, category: Filesystem },
    /// Filesystem permission denied.
    FilePermissionDenied = 03_002 => { retryable: false, log_error: true, category: Filesystem },
    /// Disk space exhausted.
    FileSpaceExhausted = 03_003 => { retryable: false, log_error: true, category: Filesystem },
    /// Stored content failed checksum verification.
    IntegrityError = 03_004 => { retryable: false, log_error: true, category: Filesystem },

    // ====== Network/Transport errors (04_xxx) ======
    /// Generic network error.
    NetworkError = 04_000 => { retryable: true, log_error: false, category: Network },
    /// Connection failed or was reset.
    ConnectionFailed = 04_001 => { retryable: true, log_error: false, category: Network },
    /// Remote returned a 5xx/protocol error.
    RemoteServerError = 04_002 => { retryable: true, log_error: true, category: Network },
    /// Request timed out.
    Timeout = 04_003 => { retryable: true, log_error: false, category: Network },

    // ====== Security errors (05_xxx) ======
    /// Authentication failed (invalid credentials).
    AuthenticationFailed = 05_000 => { retryable: false, log_error: false, category: Security },
    /// Authorization failed (valid identity, denied action).
    AuthorizationFailed = 05_001 => { retryable: false, log_error: false, category: Security },
    /// Auth header or API key not presented.
    AuthHeaderNotFound = 05_002 => { retryable: false, log_error: false, category: Security },
    /// Request violates a security policy.
    SecurityPolicyViolation = 05_003 => { retryable: false, log_error: true, category: Security },

    // ====== Configuration errors (10_xxx) ======
    /// Invalid configuration value.
    InvalidConfig = 10_000 => { retryable: false, log_error: true, category: Configuration },
    /// Config file missing or unreadable.
    ConfigFileError = 10_001 => { retryable: false, log_error: true, category: Configuration },

    // ====== Bridge lifecycle errors (11_xxx) ======
    /// Bridge worker process is not running.
    BridgeNotRunning = 11_000 => { retryable: false, log_error: true, category: Bridge },
    /// Bridge health endpoint reported failure.
    BridgeHealthFailed = 11_001 => { retryable: true, log_error: true, category: Bridge },
    /// Bridge did not become ready before the startup deadline.
    StartupTimeout = 11_002 => { retryable: true, log_error: true, category: Bridge },
    /// Bridge worker process could not be spawned.
    SpawnFailed = 11_003 => { retryable: false, log_error: true, category: Bridge },
    /// Another bridge worker is already running.
    AlreadyRunning = 11_004 => { retryable: false, log_error: false, category: Bridge },

    // ====== Resource/Limit errors (12_xxx) ======
    /// Rate limit exceeded.
    RateLimited = 12_000 => { retryable: true, log_error: false, category: Resource },
    /// Dispatch queue past its high-water mark.
    Backpressure = 12_001 => { retryable: true, log_error: false, category: Resource },
    /// Runtime resources exhausted.
    ResourcesExhausted = 12_002 => { retryable: true, log_error: true, category: Resource },
    /// Circuit breaker is open for this operation.
    CircuitOpen = 12_003 => { retryable: true, log_error: false, category: Resource },
    /// Deadline exceeded.
    DeadlineExceeded = 12_004 => { retryable: false, log_error: false, category: Resource },
    /// Concurrent execution cap reached.
    ConcurrentLimit = 12_005 => { retryable: true, log_error: false, category: Resource },
    /// Memory threshold breached.
    MemoryLimit = 12_006 => { retryable: false, log_error: true, category: Resource },

    // ====== Chat platform errors (13_xxx) ======
    /// Chat send failed.
    ChatSendFailed = 13_000 => { retryable: true, log_error: true, category: Chat },
    /// Chat platform rate limit (carries retry-after).
    ChatRateLimited = 13_001 => { retryable: true, log_error: false, category: Chat },
    /// Chat platform rejected credentials.
    ChatUnauthorized = 13_002 => { retryable: false, log_error: true, category: Chat },
    /// Callback payload could not be parsed.
    CallbackParseError = 13_003 => { retryable: false, log_error: false, category: Chat },
}

impl StatusCode {
    /// Returns true if `code` is success.
    pub fn is_success(code: i32) -> bool {
        Self::Success as i32 == code
    }

    /// Returns true if the error is retryable.
    pub const fn is_retryable(&self) -> bool {
        self.meta().retryable
    }

    /// Returns true if the error should be logged.
    pub const fn should_log_error(&self) -> bool {
        self.meta().log_error
    }

    /// Returns the category of this status code.
    pub const fn category(&self) -> ErrorCategory {
        self.meta().category
    }

    /// Convert from i32.
    pub fn from_i32(value: i32) -> Option<Self> {
        Self::from_repr(value)
    }

    /// Wire name of this code (SCREAMING_SNAKE_CASE).
    pub fn wire_name(&self) -> &'static str {
        (*self).into()
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
#[path = "status_code.test.rs"]
mod tests;
