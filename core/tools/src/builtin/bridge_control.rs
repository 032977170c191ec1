//! Worker lifecycle tools: `get_bridge_status`, `start_bridge`,
//! `stop_bridge`, `restart_bridge`, `ensure_bridge_running`,
//! `check_bridge_process`.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolFailure;
use crate::tool::ToolReply;
use crate::tool::ToolResult;

fn empty_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// Current supervisor status snapshot.
pub struct GetBridgeStatusTool;

#[async_trait]
impl Tool for GetBridgeStatusTool {
    fn name(&self) -> &str {
        "get_bridge_status"
    }

    fn description(&self) -> &str {
        "Get the worker process status"
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        let status = ctx.supervisor.status();
        let message = format!("bridge is {}", status.state.as_str());
        let payload = serde_json::to_value(status)
            .map_err(|e| ToolFailure::from_error(&crate::error::invalid_input(e)))?;
        Ok(ToolReply::payload(payload, message))
    }
}

/// Starts the worker.
pub struct StartBridgeTool;

#[async_trait]
impl Tool for StartBridgeTool {
    fn name(&self) -> &str {
        "start_bridge"
    }

    fn description(&self) -> &str {
        "Start the worker and wait until it is ready"
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        ctx.supervisor
            .start()
            .await
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::message("bridge started"))
    }
}

/// Stops the worker.
pub struct StopBridgeTool;

#[async_trait]
impl Tool for StopBridgeTool {
    fn name(&self) -> &str {
        "stop_bridge"
    }

    fn description(&self) -> &str {
        "Stop the worker"
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        ctx.supervisor
            .stop()
            .await
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::message("bridge stopped"))
    }
}

/// Restarts the worker with backoff.
pub struct RestartBridgeTool;

#[async_trait]
impl Tool for RestartBridgeTool {
    fn name(&self) -> &str {
        "restart_bridge"
    }

    fn description(&self) -> &str {
        "Restart the worker"
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        ctx.supervisor
            .restart()
            .await
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::message("bridge restarted"))
    }
}

/// Starts the worker only when needed.
pub struct EnsureBridgeRunningTool;

#[async_trait]
impl Tool for EnsureBridgeRunningTool {
    fn name(&self) -> &str {
        "ensure_bridge_running"
    }

    fn description(&self) -> &str {
        "Start the worker unless it is already running"
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        ctx.supervisor
            .ensure_running()
            .await
            .map_err(|e| ToolFailure::from_error(&e))?;
        Ok(ToolReply::message("bridge running"))
    }
}

/// Reports whether a live worker process exists.
pub struct CheckBridgeProcessTool;

#[async_trait]
impl Tool for CheckBridgeProcessTool {
    fn name(&self) -> &str {
        "check_bridge_process"
    }

    fn description(&self) -> &str {
        "Check whether the worker process is alive"
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        let alive = ctx.supervisor.check_process().await;
        Ok(ToolReply::payload(
            serde_json::json!({ "running": alive }),
            if alive { "worker alive" } else { "worker not running" },
        ))
    }
}
