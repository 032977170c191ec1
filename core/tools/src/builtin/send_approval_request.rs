//! The `send_approval_request` tool.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Asks the human for an approval in the chat.
pub struct SendApprovalRequestTool;

#[async_trait]
impl Tool for SendApprovalRequestTool {
    fn name(&self) -> &str {
        "send_approval_request"
    }

    fn description(&self) -> &str {
        "Request a human approval via the chat; the response arrives as a callback"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "description": { "type": "string" },
                "options": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "timeout_minutes": { "type": "integer" },
                "task_id": { "type": "string" }
            },
            "required": ["title", "description"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let options = input["options"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        ctx.ensure_worker_available("send_approval_request").await?;
        let receipt = ctx
            .dispatch
            .send_approval_request(
                input["title"].as_str().unwrap_or_default(),
                input["description"].as_str().unwrap_or_default(),
                options,
                input["timeout_minutes"].as_i64(),
                input["task_id"].as_str().map(str::to_string),
            )
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::accepted(receipt.event_id, "Approval request queued"))
    }
}
