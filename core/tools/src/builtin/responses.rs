//! Response query tools: `get_responses`, `process_pending_responses`,
//! `clear_old_responses`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Returns the most recent stored responses.
pub struct GetResponsesTool;

#[async_trait]
impl Tool for GetResponsesTool {
    fn name(&self) -> &str {
        "get_responses"
    }

    fn description(&self) -> &str {
        "Fetch the most recent human responses"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "minimum": 1 }
            }
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let limit = input["limit"].as_u64().unwrap_or(10) as usize;
        let responses = ctx
            .dispatch
            .get_responses(limit)
            .map_err(|e| ToolFailure::from_error(&e))?;
        let count = responses.len();
        Ok(ToolReply::payload(
            serde_json::json!({ "responses": responses }),
            format!("{count} response(s)"),
        ))
    }
}

/// Returns responses received since a cutoff, oldest first.
pub struct ProcessPendingResponsesTool;

#[async_trait]
impl Tool for ProcessPendingResponsesTool {
    fn name(&self) -> &str {
        "process_pending_responses"
    }

    fn description(&self) -> &str {
        "Fetch responses received within the recent window, oldest first"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "since_minutes": { "type": "integer", "minimum": 1 }
            }
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let since_minutes = input["since_minutes"].as_u64().unwrap_or(10);
        let responses = ctx
            .dispatch
            .process_pending_responses(Duration::from_secs(since_minutes * 60))
            .map_err(|e| ToolFailure::from_error(&e))?;
        let count = responses.len();
        Ok(ToolReply::payload(
            serde_json::json!({ "responses": responses }),
            format!("{count} pending response(s)"),
        ))
    }
}

/// Prunes stored responses older than a cutoff.
pub struct ClearOldResponsesTool;

#[async_trait]
impl Tool for ClearOldResponsesTool {
    fn name(&self) -> &str {
        "clear_old_responses"
    }

    fn description(&self) -> &str {
        "Delete stored responses older than the given age"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "older_than_hours": { "type": "integer", "minimum": 1 }
            }
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let hours = input["older_than_hours"].as_u64().unwrap_or(24);
        let removed = ctx
            .dispatch
            .clear_old_responses(Duration::from_secs(hours * 3600))
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::payload(
            serde_json::json!({ "removed": removed }),
            format!("removed {removed} response(s)"),
        ))
    }
}
