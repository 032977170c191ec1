//! The `todo` tool.

use async_trait::async_trait;
use coderelay_error::StatusCode;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Session-scoped todo list.
pub struct TodoTool;

#[async_trait]
impl Tool for TodoTool {
    fn name(&self) -> &str {
        "todo"
    }

    fn description(&self) -> &str {
        "Track session follow-ups: add, list or complete entries"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["add", "list", "done"]
                },
                "text": { "type": "string" },
                "id": { "type": "string" }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        match input["action"].as_str().unwrap_or_default() {
            "add" => {
                let Some(text) = input["text"].as_str().filter(|t| !t.trim().is_empty()) else {
                    return Err(ToolFailure::new(
                        StatusCode::ValidationFailed,
                        "add requires non-empty text",
                    ));
                };
                let item = ctx.add_todo(text);
                Ok(ToolReply::payload(
                    serde_json::json!({ "item": item }),
                    "todo added",
                ))
            }
            "list" => {
                let items = ctx.list_todos();
                let open = items.iter().filter(|t| !t.done).count();
                Ok(ToolReply::payload(
                    serde_json::json!({ "items": items }),
                    format!("{open} open item(s)"),
                ))
            }
            "done" => {
                let Some(id) = input["id"].as_str() else {
                    return Err(ToolFailure::new(
                        StatusCode::ValidationFailed,
                        "done requires an id",
                    ));
                };
                if ctx.complete_todo(id) {
                    Ok(ToolReply::message("todo completed"))
                } else {
                    Err(ToolFailure::new(
                        StatusCode::InvalidRequest,
                        format!("unknown todo id: {id}"),
                    ))
                }
            }
            other => Err(ToolFailure::new(
                StatusCode::ValidationFailed,
                format!("unknown action: {other}"),
            )),
        }
    }
}
