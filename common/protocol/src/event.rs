//! Canonical event records produced by the tool layer.

use chrono::DateTime;
use chrono::Utc;
use coderelay_error::Severity;
use serde::Deserialize;
use serde::Serialize;

use crate::event_type::EventType;

/// Typed attribute bag attached to an event.
///
/// Every field is optional; unknown fields are preserved in `extra` so a
/// newer producer's payload survives a round trip through the spool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    /// Free-form status tag (e.g. `completed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Severity of the condition the event reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Current value of a monitored quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    /// Threshold the quantity is measured against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Summary of results (build output, test counts, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
    /// Options offered to the human for an approval request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_options: Option<Vec<String>>,
    /// Minutes before an approval request expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<i64>,
    /// Files touched by the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_affected: Option<Vec<String>>,
    /// Operation duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// Process exit code, for command/build events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    /// Error message, for failure events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Unknown fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventData {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.severity.is_none()
            && self.current_value.is_none()
            && self.threshold.is_none()
            && self.results.is_none()
            && self.response_options.is_none()
            && self.timeout_minutes.is_none()
            && self.files_affected.is_none()
            && self.duration_ms.is_none()
            && self.exit_code.is_none()
            && self.error_message.is_none()
            && self.extra.is_empty()
    }
}

/// Canonical event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id; generated when the producer omits it.
    pub id: String,
    /// Event tag.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Free-form origin tag (e.g. `claude-code`).
    pub source: String,
    /// Wall-clock creation time.
    pub timestamp: DateTime<Utc>,
    /// Correlates related events and responses.
    pub task_id: String,
    /// Short human-readable title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Typed attribute bag.
    #[serde(default, skip_serializing_if = "EventData::is_empty")]
    pub data: EventData,
}

impl Event {
    /// Create an event with generated id, task id and current timestamp.
    pub fn new(
        event_type: EventType,
        source: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            source: source.into(),
            timestamp: Utc::now(),
            task_id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            data: EventData::default(),
        }
    }

    /// Set the task id.
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = task_id.into();
        self
    }

    /// Set the attribute bag.
    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    /// Serialized size in bytes, as it would land in the spool.
    pub fn serialized_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "event.test.rs"]
mod tests;
