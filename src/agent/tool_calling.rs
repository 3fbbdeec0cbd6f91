//! Tool-calling agent: detect tool calls, execute them, record the results.

use super::AgentConfig;
use crate::completion::{Completion, CompletionClient};
use crate::conversation::{Conversation, Message};
use crate::error::{Result, ScoutError};
use crate::tools::{ToolCallRequest, ToolCallResult, ToolRegistry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of one detect/execute pass.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    /// The model answered directly without requesting tools.
    Answered(String),
    /// The model requested tools; these are their raw results, in request order.
    ToolResults(Vec<ToolCallResult>),
}

impl AgentOutcome {
    /// Successful tool outputs, or the answer text.
    pub fn outputs(&self) -> Vec<String> {
        match self {
            AgentOutcome::Answered(text) => vec![text.clone()],
            AgentOutcome::ToolResults(results) => results
                .iter()
                .filter(|r| r.is_success())
                .map(|r| r.output.clone())
                .collect(),
        }
    }
}

/// Agent that lets the model invoke tools from a registry.
///
/// One [`run`](Self::run) is a single detect/execute pass. Tool outputs are returned
/// as-is and not fed back for another model turn; use
/// [`run_to_answer`](Self::run_to_answer) for that.
pub struct ToolCallingAgent {
    client: Arc<dyn CompletionClient>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    conversation: Conversation,
    pending: Vec<ToolCallRequest>,
    fail_fast: bool,
    cancel: CancellationToken,
}

impl ToolCallingAgent {
    /// Create an agent with a seeded conversation.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
        conversation: Conversation,
    ) -> Self {
        Self {
            client,
            tools,
            config,
            conversation,
            pending: Vec::new(),
            fail_fast: false,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight completions and tool calls when the token fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stop a batch at the first failing tool call instead of isolating failures.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Tool calls detected but not yet executed.
    pub fn pending_tool_calls(&self) -> &[ToolCallRequest] {
        &self.pending
    }

    /// Start an independent round: replace the conversation, keep the configuration.
    pub fn reset_conversation(&mut self, conversation: Conversation) {
        self.conversation = conversation;
        self.pending.clear();
    }

    /// Ask the model whether it wants to call tools.
    ///
    /// Requested calls are recorded in the conversation and kept pending until
    /// [`execute_tool_calls`](Self::execute_tool_calls).
    pub async fn detect_tool_calls(&mut self) -> Result<Completion> {
        let completion = self
            .client
            .complete(
                &self.conversation,
                &self.config,
                &self.tools.definitions(),
                &self.cancel,
            )
            .await?;

        match &completion {
            Completion::Text(text) => {
                debug!("No tool calls requested");
                self.conversation.push(Message::assistant(text.clone()));
                self.pending.clear();
            }
            Completion::ToolCalls(calls) => {
                info!("Detected {} tool call(s)", calls.len());
                self.conversation
                    .push(Message::assistant_tool_calls(calls.clone()));
                self.pending = calls.clone();
            }
        }

        Ok(completion)
    }

    /// Execute the pending tool calls and append their results to the conversation.
    pub async fn execute_tool_calls(&mut self) -> Result<Vec<ToolCallResult>> {
        let requests = std::mem::take(&mut self.pending);
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let parallel = self.config.parallel_tool_calls;
        let results = if self.fail_fast {
            self.tools
                .execute_batch_fail_fast(&requests, parallel, &self.cancel)
                .await?
        } else {
            self.tools
                .execute_batch(&requests, parallel, &self.cancel)
                .await?
        };

        for result in &results {
            self.conversation
                .push(Message::tool(result.request_id.clone(), result.output.clone()));
        }

        Ok(results)
    }

    /// One detect/execute pass.
    pub async fn run(&mut self) -> Result<AgentOutcome> {
        match self.detect_tool_calls().await? {
            Completion::Text(text) => Ok(AgentOutcome::Answered(text)),
            Completion::ToolCalls(_) => Ok(AgentOutcome::ToolResults(self.execute_tool_calls().await?)),
        }
    }

    /// Alternate detect/execute passes until the model answers in text.
    pub async fn run_to_answer(&mut self, max_rounds: usize) -> Result<String> {
        for round in 1..=max_rounds {
            debug!("Agent round {}", round);
            if let AgentOutcome::Answered(text) = self.run().await? {
                return Ok(text);
            }
        }
        Err(ScoutError::MaxRounds(max_rounds))
    }

    /// Pending tool calls as pretty-printed JSON.
    pub fn tool_calls_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.pending)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::testing::{args, ScriptedClient, StaticTool};

    fn registry() -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::new()
                .with_tool(Arc::new(StaticTool::new("search", |a| {
                    Ok(format!("results for {}", a["query"].as_str().unwrap_or("")))
                })))
                .with_tool(Arc::new(StaticTool::new("fetch", |a| {
                    let url = a["url"].as_str().unwrap_or("");
                    if url.ends_with("/b") {
                        Err(ScoutError::Transport("timeout".to_string()))
                    } else {
                        Ok(format!("page {}", url))
                    }
                }))),
        )
    }

    fn agent(client: ScriptedClient, parallel: bool) -> ToolCallingAgent {
        ToolCallingAgent::new(
            Arc::new(client),
            registry(),
            AgentConfig::new("ai/qwen2.5:latest").with_parallel_tool_calls(parallel),
            Conversation::from_user("Search the latest information about Docker."),
        )
    }

    #[tokio::test]
    async fn test_text_answer_is_done() {
        let client = ScriptedClient::new().complete_with(Completion::Text("Docker is...".to_string()));
        let mut agent = agent(client, true);

        let outcome = agent.run().await.unwrap();
        assert_eq!(outcome, AgentOutcome::Answered("Docker is...".to_string()));
        assert_eq!(agent.conversation().len(), 2);
        assert!(agent.pending_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_appends_results_in_order() {
        let calls = vec![
            ToolCallRequest::new("c1", "fetch", args(&[("url", "https://example.com/a")])),
            ToolCallRequest::new("c2", "fetch", args(&[("url", "https://example.com/b")])),
            ToolCallRequest::new("c3", "fetch", args(&[("url", "https://example.com/c")])),
        ];
        let client = ScriptedClient::new().complete_with(Completion::ToolCalls(calls));
        let mut agent = agent(client, true);

        let results = match agent.run().await.unwrap() {
            AgentOutcome::ToolResults(results) => results,
            other => panic!("Expected tool results, got {:?}", other),
        };

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(results[2].is_success());

        let messages = agent.conversation().messages();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[1].tool_calls.len(), 3);
        let tool_ids: Vec<_> = messages[2..]
            .iter()
            .map(|m| {
                assert_eq!(m.role, Role::Tool);
                m.tool_call_id.clone().unwrap()
            })
            .collect();
        assert_eq!(tool_ids, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_batch() {
        let calls = vec![
            ToolCallRequest::new("c1", "fetch", args(&[("url", "https://example.com/b")])),
            ToolCallRequest::new("c2", "fetch", args(&[("url", "https://example.com/c")])),
        ];
        let client = ScriptedClient::new().complete_with(Completion::ToolCalls(calls));
        let mut agent = agent(client, false).with_fail_fast(true);

        let err = agent.run().await.unwrap_err();
        assert!(matches!(err, ScoutError::ToolExecution { .. }));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_configuration_error() {
        let calls = vec![ToolCallRequest::new("c1", "rm_rf", args(&[]))];
        let client = ScriptedClient::new().complete_with(Completion::ToolCalls(calls));
        let mut agent = agent(client, true);

        let err = agent.run().await.unwrap_err();
        assert!(matches!(err, ScoutError::ToolNotFound(name) if name == "rm_rf"));
    }

    #[tokio::test]
    async fn test_transport_error_fails_round() {
        let client = ScriptedClient::new().complete_err(ScoutError::Transport("refused".to_string()));
        let mut agent = agent(client, true);

        assert!(matches!(agent.run().await, Err(ScoutError::Transport(_))));
    }

    #[tokio::test]
    async fn test_tool_calls_json_and_reset() {
        let calls = vec![ToolCallRequest::new(
            "c1",
            "search",
            args(&[("query", "Docker")]),
        )];
        let client = ScriptedClient::new().complete_with(Completion::ToolCalls(calls));
        let mut agent = agent(client, true);

        agent.detect_tool_calls().await.unwrap();
        let json = agent.tool_calls_json().unwrap();
        assert!(json.contains("\"tool_name\": \"search\""));
        assert!(json.contains("\"query\": \"Docker\""));

        agent.reset_conversation(Conversation::from_user("something else"));
        assert_eq!(agent.conversation().len(), 1);
        assert!(agent.pending_tool_calls().is_empty());
        assert_eq!(agent.config().model, "ai/qwen2.5:latest");
    }

    #[tokio::test]
    async fn test_run_to_answer_feeds_results_back() {
        let calls = vec![ToolCallRequest::new("c1", "search", args(&[("query", "Docker")]))];
        let client = ScriptedClient::new()
            .complete_with(Completion::ToolCalls(calls))
            .complete_with(Completion::Text("Docker 28 was released.".to_string()));
        let mut agent = agent(client, true);

        let answer = agent.run_to_answer(3).await.unwrap();
        assert_eq!(answer, "Docker 28 was released.");
        // user, assistant(tool calls), tool, assistant(text)
        assert_eq!(agent.conversation().len(), 4);
    }

    #[tokio::test]
    async fn test_run_to_answer_gives_up() {
        let call = || vec![ToolCallRequest::new("c1", "search", args(&[("query", "Docker")]))];
        let client = ScriptedClient::new()
            .complete_with(Completion::ToolCalls(call()))
            .complete_with(Completion::ToolCalls(call()));
        let mut agent = agent(client, true);

        assert!(matches!(
            agent.run_to_answer(2).await,
            Err(ScoutError::MaxRounds(2))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_detection() {
        let token = CancellationToken::new();
        token.cancel();
        let client = ScriptedClient::new().complete_with(Completion::Text("unused".to_string()));
        let mut agent = agent(client, true).with_cancellation(token);

        assert!(matches!(agent.run().await, Err(ScoutError::Cancelled)));
    }
}
