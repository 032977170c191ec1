//! Callback records produced when a human responds in the chat client.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Action encoded in the callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseAction {
    Approve,
    Deny,
    Acknowledge,
    Details,
    /// Callback data that did not parse into a known action.
    Unknown,
}

impl ResponseAction {
    /// Get the action as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseAction::Approve => "approve",
            ResponseAction::Deny => "deny",
            ResponseAction::Acknowledge => "acknowledge",
            ResponseAction::Details => "details",
            ResponseAction::Unknown => "unknown",
        }
    }

    /// Whether this action should trigger a chat-side acknowledgement.
    pub fn wants_ack(&self) -> bool {
        !matches!(self, ResponseAction::Unknown)
    }
}

impl std::fmt::Display for ResponseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsed form of the opaque `{action}_{task_id}` callback string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCallback {
    /// Action prefix.
    pub action: ResponseAction,
    /// Remainder after the action prefix; free-form when the callback does
    /// not correlate to a live request.
    pub task_id: String,
}

impl ParsedCallback {
    /// Parse callback data of the form `{action}_{task_id}`.
    ///
    /// Anything that does not start with a known action prefix maps to
    /// [`ResponseAction::Unknown`] with the whole string as task id.
    pub fn parse(callback_data: &str) -> Self {
        for action in [
            ResponseAction::Approve,
            ResponseAction::Deny,
            ResponseAction::Acknowledge,
            ResponseAction::Details,
        ] {
            let prefix = format!("{}_", action.as_str());
            if let Some(task_id) = callback_data.strip_prefix(&prefix) {
                return Self {
                    action,
                    task_id: task_id.to_string(),
                };
            }
        }
        Self {
            action: ResponseAction::Unknown,
            task_id: callback_data.to_string(),
        }
    }
}

/// A human response delivered through the webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Unique response id.
    pub id: String,
    /// Raw callback data (`{action}_{task_id}`).
    pub callback_data: String,
    /// Parsed action.
    pub action: ResponseAction,
    /// Parsed task id.
    pub task_id: String,
    /// Chat platform user id.
    pub user_id: i64,
    /// Chat username, when the platform supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// User first name, when the platform supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// When the human responded.
    pub timestamp: DateTime<Utc>,
    /// Correlation id from the inbound request, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Response {
    /// Build a response from raw callback data, parsing the action.
    pub fn from_callback(
        callback_data: impl Into<String>,
        user_id: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let callback_data = callback_data.into();
        let parsed = ParsedCallback::parse(&callback_data);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            callback_data,
            action: parsed.action,
            task_id: parsed.task_id,
            user_id,
            username: None,
            first_name: None,
            timestamp,
            correlation_id: None,
        }
    }

    /// Attach the user's display fields.
    pub fn with_user(mut self, username: Option<String>, first_name: Option<String>) -> Self {
        self.username = username;
        self.first_name = first_name;
        self
    }

    /// Attach a correlation id.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

#[cfg(test)]
#[path = "response.test.rs"]
mod tests;
