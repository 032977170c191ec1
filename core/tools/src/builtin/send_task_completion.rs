//! The `send_task_completion` tool.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Reports a finished task.
pub struct SendTaskCompletionTool;

#[async_trait]
impl Tool for SendTaskCompletionTool {
    fn name(&self) -> &str {
        "send_task_completion"
    }

    fn description(&self) -> &str {
        "Notify the chat that a task completed"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": { "type": "string" },
                "title": { "type": "string" },
                "results": { "type": "string" },
                "duration_ms": { "type": "integer" }
            },
            "required": ["task_id", "title"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        ctx.ensure_worker_available("send_task_completion").await?;
        let receipt = ctx
            .dispatch
            .send_task_completion(
                input["task_id"].as_str().unwrap_or_default(),
                input["title"].as_str().unwrap_or_default(),
                input["results"].as_str().map(str::to_string),
                input["duration_ms"].as_i64(),
            )
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::accepted(receipt.event_id, "Task completion queued"))
    }
}
