//! Tools the model can invoke, and the registry that dispatches them by name.

mod registry;

pub use registry::ToolRegistry;

use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A model-issued request to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Opaque id chosen by the model, echoed back in the tool message.
    pub id: String,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// String argument by name, if present.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }
}

impl std::fmt::Display for ToolCallRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.tool_name, Value::Object(self.arguments.clone()))
    }
}

/// Outcome of executing one tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallResult {
    pub request_id: String,
    pub tool_name: String,
    /// Tool output, or the error text when the call failed.
    pub output: String,
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn success(request: &ToolCallRequest, output: String) -> Self {
        Self {
            request_id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            output,
            error: None,
        }
    }

    pub fn failure(request: &ToolCallRequest, message: String) -> Self {
        Self {
            request_id: request.id.clone(),
            tool_name: request.tool_name.clone(),
            output: format!("Tool error: {}", message),
            error: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The output, or the failure as a `ToolExecution` error.
    pub fn into_result(self) -> Result<String> {
        match self.error {
            None => Ok(self.output),
            Some(message) => Err(ScoutError::ToolExecution {
                tool: self.tool_name,
                message,
            }),
        }
    }
}

/// Declaration of a tool as advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// An executable capability the model can select by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the accepted arguments.
    fn input_schema(&self) -> Value;

    /// Run the tool and return its text payload.
    async fn call(&self, arguments: &Map<String, Value>) -> Result<String>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }
}
