//! Gateway tools exposed through the [`Tool`] trait.

use super::client::McpClient;
use super::protocol::RemoteTool;
use crate::error::{Result, ScoutError};
use crate::tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

/// One tool hosted by the gateway.
pub struct McpTool {
    client: Arc<McpClient>,
    name: String,
    description: String,
    input_schema: Value,
}

impl McpTool {
    pub fn new(client: Arc<McpClient>, remote: RemoteTool) -> Self {
        let input_schema = if remote.input_schema.is_object() {
            remote.input_schema
        } else {
            json!({"type": "object", "properties": {}})
        };

        Self {
            client,
            name: remote.name,
            description: remote.description.unwrap_or_default(),
            input_schema,
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.input_schema.clone()
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<String> {
        self.client.call_tool(&self.name, arguments).await
    }
}

impl ToolRegistry {
    /// Registry holding only the named gateway tools.
    ///
    /// Fails if the gateway does not offer one of them.
    pub async fn from_gateway<S: AsRef<str>>(client: Arc<McpClient>, names: &[S]) -> Result<Self> {
        let offered = client.list_tools().await?;
        let mut registry = ToolRegistry::new();

        for name in names {
            let name = name.as_ref();
            let remote = offered
                .iter()
                .find(|t| t.name == name)
                .cloned()
                .ok_or_else(|| ScoutError::ToolNotFound(name.to_string()))?;
            registry.register(Arc::new(McpTool::new(client.clone(), remote)));
        }

        info!("Using gateway tools: {}", registry.names().join(", "));
        Ok(registry)
    }
}
