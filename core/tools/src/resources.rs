//! Read-only resources exposed alongside the tools.

use std::sync::Arc;

use coderelay_protocol::EventType;
use serde_json::Value;

use crate::context::ToolContext;

/// Resource names served by [`read_resource`].
pub const RESOURCE_NAMES: &[&str] = &[
    "event-types",
    "bridge-status",
    "responses",
    "event-templates",
];

/// Serve one read-only resource as JSON; `None` for unknown names.
pub fn read_resource(name: &str, ctx: &Arc<ToolContext>) -> Option<Value> {
    match name {
        "event-types" => Some(serde_json::json!({
            "event_types": EventType::known()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect::<Vec<String>>(),
        })),
        "bridge-status" => {
            let status = ctx.supervisor.status();
            serde_json::to_value(status).ok()
        }
        "responses" => {
            let responses = ctx.dispatch.get_responses(50).ok()?;
            Some(serde_json::json!({ "responses": responses }))
        }
        "event-templates" => Some(event_templates()),
        _ => None,
    }
}

/// Ready-to-fill example payloads for the common tools.
fn event_templates() -> Value {
    serde_json::json!({
        "task_completion": {
            "type": "task_completion",
            "title": "Task finished",
            "description": "What was accomplished",
            "task_id": "<task id>",
            "data": { "status": "completed", "duration_ms": 0 }
        },
        "approval_request": {
            "type": "approval_request",
            "title": "Approval needed",
            "description": "What requires approval",
            "data": {
                "response_options": ["Approve", "Deny"],
                "timeout_minutes": 30
            }
        },
        "performance_alert": {
            "type": "performance_alert",
            "title": "Threshold crossed",
            "description": "What regressed",
            "data": { "severity": "high", "current_value": 0, "threshold": 0 }
        },
        "info_notification": {
            "type": "info_notification",
            "title": "FYI",
            "description": "Details"
        }
    })
}

#[cfg(test)]
#[path = "resources.test.rs"]
mod tests;
