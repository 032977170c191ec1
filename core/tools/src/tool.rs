//! Tool trait and reply envelope.
//!
//! A tool is one operation of the tool-protocol surface. The transport
//! framing is out of scope; the registry is the
//! `(tool_name, json_params) -> json_result` boundary the orchestrator
//! consumes.

use async_trait::async_trait;
use coderelay_error::ErrorExt;
use coderelay_error::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::context::ToolContext;

/// Successful tool reply.
#[derive(Debug, Clone, Serialize)]
pub struct ToolReply {
    /// Always true; failures travel as [`ToolFailure`].
    pub success: bool,
    /// Accepted event id, for the send family.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Structured payload, for query tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Human-readable summary.
    pub message: String,
}

impl ToolReply {
    /// Reply carrying an accepted event id.
    pub fn accepted(event_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            event_id: Some(event_id.into()),
            payload: None,
            message: message.into(),
        }
    }

    /// Reply carrying a payload.
    pub fn payload(payload: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            event_id: None,
            payload: Some(payload),
            message: message.into(),
        }
    }

    /// Reply with a message only.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            event_id: None,
            payload: None,
            message: message.into(),
        }
    }
}

/// Structured tool failure: `{code, message, metadata}`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolFailure {
    /// Stable wire code (SCREAMING_SNAKE_CASE).
    pub code: String,
    /// User-facing message.
    pub message: String,
    /// Secret-free metadata.
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, Value>,
}

impl ToolFailure {
    /// Build a failure from a status code.
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: code.wire_name().to_string(),
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Build a failure from any workspace error.
    pub fn from_error(err: &dyn ErrorExt) -> Self {
        Self::new(err.status_code(), err.output_msg())
    }

    /// Attach a metadata entry. Callers must only pass secret-free data.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Result of one tool invocation.
pub type ToolResult = std::result::Result<ToolReply, ToolFailure>;

/// One tool-protocol operation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get the tool description.
    fn description(&self) -> &str;

    /// Get the JSON schema for tool input.
    fn input_schema(&self) -> Value;

    /// Validate the input before execution.
    ///
    /// Default implementation checks required fields from the schema.
    fn validate(&self, input: &Value) -> Result<(), ToolFailure> {
        let schema = self.input_schema();
        if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
            for field in required {
                if let Some(name) = field.as_str() {
                    if input.get(name).is_none() {
                        return Err(ToolFailure::new(
                            StatusCode::ValidationFailed,
                            format!("Missing required field: {name}"),
                        )
                        .with_metadata("field", Value::String(name.to_string())));
                    }
                }
            }
        }
        Ok(())
    }

    /// Execute the tool with the given input.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult;
}

/// Descriptor exposed by `list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}
