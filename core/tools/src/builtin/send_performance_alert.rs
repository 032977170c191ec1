//! The `send_performance_alert` tool.

use async_trait::async_trait;
use coderelay_error::Severity;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

/// Reports a crossed performance threshold.
pub struct SendPerformanceAlertTool;

#[async_trait]
impl Tool for SendPerformanceAlertTool {
    fn name(&self) -> &str {
        "send_performance_alert"
    }

    fn description(&self) -> &str {
        "Alert the chat about a performance threshold breach"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "current_value": { "type": "number" },
                "threshold": { "type": "number" },
                "severity": {
                    "type": "string",
                    "enum": ["low", "medium", "high", "critical"]
                }
            },
            "required": ["title", "current_value", "threshold"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        let severity = input["severity"]
            .as_str()
            .and_then(|s| serde_json::from_value::<Severity>(Value::String(s.to_string())).ok())
            .unwrap_or(Severity::Medium);

        ctx.ensure_worker_available("send_performance_alert").await?;
        let receipt = ctx
            .dispatch
            .send_performance_alert(
                input["title"].as_str().unwrap_or_default(),
                input["current_value"].as_f64().unwrap_or(0.0),
                input["threshold"].as_f64().unwrap_or(0.0),
                severity,
            )
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::accepted(receipt.event_id, "Performance alert queued"))
    }
}
