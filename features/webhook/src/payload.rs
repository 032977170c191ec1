//! Wire types for the webhook surface.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Inbound callback payload from the chat worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    /// Payload discriminator; only `telegram_response` is accepted.
    #[serde(rename = "type")]
    pub payload_type: String,
    /// Opaque `{action}_{task_id}` callback string.
    pub callback_data: String,
    /// Chat platform user id.
    pub user_id: i64,
    /// Optional username.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional first name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// When the human responded (ISO-8601).
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied correlation id.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// Successful webhook reply.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackReply {
    pub success: bool,
    pub correlation_id: String,
    pub action: String,
    pub task_id: String,
    pub acknowledgement_sent: bool,
    pub processing_ms: u64,
}

/// Error reply body with a stable code.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    pub code: String,
    pub message: String,
}

impl ErrorReply {
    /// Build an error reply.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Health endpoint reply.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReply {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
}
