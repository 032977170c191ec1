//! The `send_message` tool.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Sends a free-form informational message.
pub struct SendMessageTool;

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a plain text message to the chat"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": { "type": "string" },
                "source": { "type": "string" }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let message = input["message"].as_str().unwrap_or_default();
        let source = input["source"].as_str().unwrap_or("claude-code");
        ctx.ensure_worker_available("send_message").await?;
        let receipt = ctx
            .dispatch
            .send_message(message, source)
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::accepted(receipt.event_id, "Message queued"))
    }
}
