//! The `get_task_status` tool.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Reconstructs a task's latest state from its spooled events.
pub struct GetTaskStatusTool;

#[async_trait]
impl Tool for GetTaskStatusTool {
    fn name(&self) -> &str {
        "get_task_status"
    }

    fn description(&self) -> &str {
        "Get the latest known state of a task from its event history"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": { "type": "string" }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let task_id = input["task_id"].as_str().unwrap_or_default();

        let records = ctx
            .dispatch
            .spool()
            .events()
            .iterate(None)
            .map_err(|e| ToolFailure::from_error(&e))?;

        let mut events: Vec<Value> = Vec::new();
        let mut latest: Option<Value> = None;
        for record in records {
            if record.record.task_id != task_id {
                continue;
            }
            let entry = serde_json::json!({
                "type": record.record.event_type.as_str(),
                "title": record.record.title,
                "timestamp": record.record.timestamp,
                "status": record.record.data.status,
            });
            latest = Some(entry.clone());
            events.push(entry);
        }

        let message = match &latest {
            Some(entry) => format!(
                "task {task_id}: {}",
                entry["type"].as_str().unwrap_or("unknown")
            ),
            None => format!("no events recorded for task {task_id}"),
        };
        Ok(ToolReply::payload(
            serde_json::json!({
                "task_id": task_id,
                "latest": latest,
                "events": events,
            }),
            message,
        ))
    }
}
