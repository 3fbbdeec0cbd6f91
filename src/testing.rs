//! Scripted completion client and in-process tools for unit tests.

use crate::agent::{AgentConfig, ExtractionSchema};
use crate::cancel::cancellable;
use crate::completion::{collect_stream, ChunkHandler, Completion, CompletionClient, StreamInterrupted};
use crate::conversation::Conversation;
use crate::error::{Result, ScoutError};
use crate::tools::{Tool, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Build an arguments object from string pairs.
pub fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

/// Which client mode served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Complete,
    Structured,
    Stream,
}

/// Completion client that replays queued responses and records every call.
#[derive(Default)]
pub struct ScriptedClient {
    completions: Mutex<VecDeque<Result<Completion>>>,
    structured: Mutex<VecDeque<Result<String>>>,
    streams: Mutex<VecDeque<Vec<Result<String>>>>,
    calls: Mutex<Vec<(CallKind, Conversation, AgentConfig)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete_with(self, completion: Completion) -> Self {
        self.completions.lock().unwrap().push_back(Ok(completion));
        self
    }

    pub fn complete_err(self, error: ScoutError) -> Self {
        self.completions.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn structured_with(self, json: &str) -> Self {
        self.structured.lock().unwrap().push_back(Ok(json.to_string()));
        self
    }

    pub fn stream_with(self, chunks: Vec<Result<String>>) -> Self {
        self.streams.lock().unwrap().push_back(chunks);
        self
    }

    /// Text chunks that all arrive.
    pub fn stream_text(self, chunks: &[&str]) -> Self {
        self.stream_with(chunks.iter().map(|c| Ok(c.to_string())).collect())
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<(CallKind, Conversation, AgentConfig)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_kinds(&self) -> Vec<CallKind> {
        self.calls().into_iter().map(|(kind, _, _)| kind).collect()
    }

    /// Conversations received so far, in call order.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.calls().into_iter().map(|(_, conversation, _)| conversation).collect()
    }

    fn record(&self, kind: CallKind, conversation: &Conversation, config: &AgentConfig) {
        self.calls
            .lock()
            .unwrap()
            .push((kind, conversation.clone(), config.clone()));
    }
}

fn exhausted() -> ScoutError {
    ScoutError::Transport("script exhausted".to_string())
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        _tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        self.record(CallKind::Complete, conversation, config);
        let next = self.completions.lock().unwrap().pop_front();
        cancellable(cancel, async { next.unwrap_or_else(|| Err(exhausted())) }).await
    }

    async fn complete_structured(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        _schema: &ExtractionSchema,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.record(CallKind::Structured, conversation, config);
        let next = self.structured.lock().unwrap().pop_front();
        cancellable(cancel, async { next.unwrap_or_else(|| Err(exhausted())) }).await
    }

    async fn complete_stream(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        on_chunk: &mut ChunkHandler<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, StreamInterrupted> {
        self.record(CallKind::Stream, conversation, config);
        let chunks = self.streams.lock().unwrap().pop_front();
        let chunks = chunks.unwrap_or_else(|| vec![Err(exhausted())]);
        collect_stream(futures::stream::iter(chunks), on_chunk, cancel).await
    }
}

type Handler = dyn Fn(&Map<String, Value>) -> Result<String> + Send + Sync;

/// Tool backed by a closure.
pub struct StaticTool {
    name: String,
    handler: Box<Handler>,
}

impl StaticTool {
    pub fn new<F>(name: &str, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<String> {
        (self.handler)(arguments)
    }
}
