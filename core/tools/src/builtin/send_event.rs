//! The generic `send_event` tool.

use async_trait::async_trait;
use coderelay_protocol::Event;
use coderelay_protocol::EventData;
use coderelay_protocol::EventType;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Accepts any event of the canonical model.
pub struct SendEventTool;

#[async_trait]
impl Tool for SendEventTool {
    fn name(&self) -> &str {
        "send_event"
    }

    fn description(&self) -> &str {
        "Send a structured event to the chat bridge"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "description": "Event type tag (e.g. task_completion)"
                },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "source": { "type": "string" },
                "task_id": { "type": "string" },
                "data": { "type": "object" }
            },
            "required": ["type", "title", "description"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let event_type = EventType::parse(input["type"].as_str().unwrap_or_default());
        let title = input["title"].as_str().unwrap_or_default();
        let description = input["description"].as_str().unwrap_or_default();
        let source = input["source"].as_str().unwrap_or("claude-code");

        let mut event = Event::new(event_type, source, title, description);
        if let Some(task_id) = input["task_id"].as_str() {
            event = event.with_task_id(task_id);
        }
        if let Some(data) = input.get("data") {
            let data: EventData = serde_json::from_value(data.clone())
                .map_err(|e| ToolFailure::from_error(&crate::error::invalid_input(e)))?;
            event = event.with_data(data);
        }

        // Validation strictly precedes the worker check: bad input never
        // triggers a recovery run.
        ctx.dispatch
            .validate_event(&event)
            .map_err(|e| ToolFailure::from_error(&e))?;
        ctx.ensure_worker_available("send_event").await?;

        let receipt = ctx
            .dispatch
            .send_event(event)
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::accepted(receipt.event_id, "Event accepted"))
    }
}
