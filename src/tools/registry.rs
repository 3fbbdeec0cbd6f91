//! Name-based tool registry and batch executor.

use super::{Tool, ToolCallRequest, ToolCallResult, ToolDefinition};
use crate::cancel::cancellable;
use crate::error::{Result, ScoutError};
use futures::future::{join_all, try_join_all};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maps tool names to executable tools.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Look up a tool, failing closed on unknown names.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.get(name)
            .ok_or_else(|| ScoutError::ToolNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool declarations to advertise to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute a single tool call. Tool failures are captured in the result.
    pub async fn execute(
        &self,
        request: &ToolCallRequest,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult> {
        let tool = self.resolve(&request.tool_name)?;
        let result = invoke(tool, request, cancel).await;
        if cancel.is_cancelled() {
            return Err(ScoutError::Cancelled);
        }
        Ok(result)
    }

    /// Execute a batch of tool calls, attempting every call independently.
    ///
    /// All names are resolved before anything runs. Results come back in request
    /// order whether or not the calls ran concurrently.
    pub async fn execute_batch(
        &self,
        requests: &[ToolCallRequest],
        parallel: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolCallResult>> {
        let tools = self.resolve_all(requests)?;
        info!("Executing {} tool call(s) (parallel: {})", requests.len(), parallel);

        let results = if parallel {
            join_all(
                tools
                    .into_iter()
                    .zip(requests)
                    .map(|(tool, request)| invoke(tool, request, cancel)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(requests.len());
            for (tool, request) in tools.into_iter().zip(requests) {
                results.push(invoke(tool, request, cancel).await);
                if cancel.is_cancelled() {
                    break;
                }
            }
            results
        };

        if cancel.is_cancelled() {
            return Err(ScoutError::Cancelled);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            warn!("{} of {} tool call(s) failed", failed, results.len());
        }

        Ok(results)
    }

    /// Execute a batch of tool calls, stopping at the first failure.
    pub async fn execute_batch_fail_fast(
        &self,
        requests: &[ToolCallRequest],
        parallel: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolCallResult>> {
        let tools = self.resolve_all(requests)?;

        if parallel {
            let results = try_join_all(tools.into_iter().zip(requests).map(|(tool, request)| async move {
                invoke(tool, request, cancel)
                    .await
                    .into_result()
                    .map(|output| ToolCallResult::success(request, output))
            }))
            .await;
            // A cancelled call surfaces as a failed result; report the abort instead
            check_cancelled(cancel)?;
            return results;
        }

        let mut results = Vec::with_capacity(requests.len());
        for (tool, request) in tools.into_iter().zip(requests) {
            let result = invoke(tool, request, cancel).await;
            check_cancelled(cancel)?;
            let output = result.into_result()?;
            results.push(ToolCallResult::success(request, output));
        }
        Ok(results)
    }

    fn resolve_all(&self, requests: &[ToolCallRequest]) -> Result<Vec<Arc<dyn Tool>>> {
        requests.iter().map(|r| self.resolve(&r.tool_name)).collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ScoutError::Cancelled)
    } else {
        Ok(())
    }
}

/// Run one tool and fold its outcome into a result record.
async fn invoke(
    tool: Arc<dyn Tool>,
    request: &ToolCallRequest,
    cancel: &CancellationToken,
) -> ToolCallResult {
    info!("Calling tool: {}", request);

    match cancellable(cancel, tool.call(&request.arguments)).await {
        Ok(output) => {
            debug!("Tool {} returned {} chars", request.tool_name, output.len());
            ToolCallResult::success(request, output)
        }
        Err(ScoutError::ToolExecution { message, .. }) => {
            warn!("Tool {} failed: {}", request.tool_name, message);
            ToolCallResult::failure(request, message)
        }
        Err(e) => {
            warn!("Tool {} failed: {}", request.tool_name, e);
            ToolCallResult::failure(request, e.to_string())
        }
    }
}
