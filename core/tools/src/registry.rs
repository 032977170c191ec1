//! Tool registry: the `(tool_name, json_params) -> json_result` surface.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::builtin;
use crate::context::ToolContext;
use crate::tool::Tool;
use crate::tool::ToolDescriptor;
use crate::tool::ToolFailure;

/// Registry of tools keyed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    ctx: Arc<ToolContext>,
}

impl ToolRegistry {
    /// Registry with every built-in operation installed.
    pub fn with_builtins(ctx: Arc<ToolContext>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
            ctx,
        };
        registry.register(Arc::new(builtin::SendEventTool));
        registry.register(Arc::new(builtin::SendMessageTool));
        registry.register(Arc::new(builtin::SendTaskCompletionTool));
        registry.register(Arc::new(builtin::SendPerformanceAlertTool));
        registry.register(Arc::new(builtin::SendApprovalRequestTool));
        registry.register(Arc::new(builtin::GetResponsesTool));
        registry.register(Arc::new(builtin::ProcessPendingResponsesTool));
        registry.register(Arc::new(builtin::ClearOldResponsesTool));
        registry.register(Arc::new(builtin::GetBridgeStatusTool));
        registry.register(Arc::new(builtin::StartBridgeTool));
        registry.register(Arc::new(builtin::StopBridgeTool));
        registry.register(Arc::new(builtin::RestartBridgeTool));
        registry.register(Arc::new(builtin::EnsureBridgeRunningTool));
        registry.register(Arc::new(builtin::CheckBridgeProcessTool));
        registry.register(Arc::new(builtin::ListEventTypesTool));
        registry.register(Arc::new(builtin::GetTaskStatusTool));
        registry.register(Arc::new(builtin::TodoTool));
        registry
    }

    /// Install a tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Descriptors for the `list` surface.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Invoke a tool; the reply is always a JSON envelope.
    ///
    /// Success: the tool's reply object with `success=true`.
    /// Failure: `{"success": false, "error": {code, message, metadata}}`.
    pub async fn invoke(&self, name: &str, params: Value) -> Value {
        let Some(tool) = self.tools.get(name) else {
            return failure_envelope(&ToolFailure::new(
                coderelay_error::StatusCode::InvalidRequest,
                format!("unknown tool: {name}"),
            ));
        };

        if let Err(failure) = tool.validate(&params) {
            return failure_envelope(&failure);
        }

        let started = std::time::Instant::now();
        let result = tool.execute(params, &self.ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(reply) => {
                tracing::debug!(tool = name, elapsed_ms, "tool call succeeded");
                serde_json::to_value(reply).unwrap_or_else(|_| {
                    serde_json::json!({ "success": true, "message": "ok" })
                })
            }
            Err(failure) => {
                tracing::debug!(tool = name, elapsed_ms, code = %failure.code, "tool call failed");
                failure_envelope(&failure)
            }
        }
    }
}

fn failure_envelope(failure: &ToolFailure) -> Value {
    serde_json::json!({
        "success": false,
        "error": failure,
    })
}

#[cfg(test)]
#[path = "registry.test.rs"]
mod tests;
