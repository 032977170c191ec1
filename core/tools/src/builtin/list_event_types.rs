//! The `list_event_types` tool.

use async_trait::async_trait;
use coderelay_protocol::EventType;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Lists the closed set of event tags.
pub struct ListEventTypesTool;

#[async_trait]
impl Tool for ListEventTypesTool {
    fn name(&self) -> &str {
        "list_event_types"
    }

    fn description(&self) -> &str {
        "List the event type tags accepted by send_event"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: Value, _ctx: &ToolContext) -> ToolResult {
        let types: Vec<String> = EventType::known()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();
        let count = types.len();
        Ok(ToolReply::payload(
            serde_json::json!({ "event_types": types }),
            format!("{count} event types"),
        ))
    }
}
