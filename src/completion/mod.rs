//! Completion client: the session wrapper around a chat-completion endpoint.
//!
//! Three modes are supported: plain/tool-augmented completion, schema-constrained
//! completion and streaming completion.

mod openai;

pub use openai::OpenAICompletionClient;

use crate::agent::{AgentConfig, ExtractionSchema};
use crate::conversation::Conversation;
use crate::error::{Result, ScoutError};
use crate::tools::{ToolCallRequest, ToolDefinition};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What the model committed to for one non-streaming turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A final text answer.
    Text(String),
    /// A non-empty list of tool invocations, in the order the model returned them.
    ToolCalls(Vec<ToolCallRequest>),
}

impl Completion {
    /// Classify a raw response message.
    ///
    /// Tool calls take precedence over any accompanying text. A message with neither
    /// is malformed.
    pub fn from_parts(content: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Result<Self> {
        if !tool_calls.is_empty() {
            if content.as_deref().is_some_and(|c| !c.trim().is_empty()) {
                debug!("Ignoring text that accompanied {} tool call(s)", tool_calls.len());
            }
            return Ok(Completion::ToolCalls(tool_calls));
        }

        content.map(Completion::Text).ok_or_else(|| {
            ScoutError::MalformedResponse("response has neither content nor tool calls".to_string())
        })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Completion::Text(text) => Some(text),
            Completion::ToolCalls(_) => None,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Completion::Text(_) => &[],
            Completion::ToolCalls(calls) => calls,
        }
    }
}

/// Consumer of streamed text chunks. Returning an error aborts the stream.
pub type ChunkHandler<'a> = dyn FnMut(&str) -> Result<()> + Send + 'a;

/// A stream that ended early, with the text received before it stopped.
#[derive(Debug, Error)]
#[error("{error} (after {} streamed chars)", .partial.len())]
pub struct StreamInterrupted {
    pub partial: String,
    #[source]
    pub error: ScoutError,
}

impl StreamInterrupted {
    pub fn new(partial: String, error: ScoutError) -> Self {
        Self { partial, error }
    }
}

impl From<StreamInterrupted> for ScoutError {
    fn from(interrupted: StreamInterrupted) -> Self {
        ScoutError::Interrupted {
            partial: interrupted.partial,
            source: Box::new(interrupted.error),
        }
    }
}

/// Client for an OpenAI-compatible chat completion endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// One non-streaming turn, optionally offering tools to the model.
    async fn complete(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<Completion>;

    /// One turn constrained to the given schema; returns the raw JSON text.
    async fn complete_structured(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        schema: &ExtractionSchema,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// One streaming turn. Every chunk goes to `on_chunk` in arrival order and the
    /// concatenation of all chunks is returned.
    async fn complete_stream(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        on_chunk: &mut ChunkHandler<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, StreamInterrupted>;
}

/// Drain a stream of text fragments into `on_chunk`, accumulating the full text.
///
/// Cancellation is checked before every fragment. Empty fragments are skipped.
pub async fn collect_stream<S>(
    stream: S,
    on_chunk: &mut ChunkHandler<'_>,
    cancel: &CancellationToken,
) -> std::result::Result<String, StreamInterrupted>
where
    S: Stream<Item = Result<String>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut text = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(StreamInterrupted::new(text, ScoutError::Cancelled));
            }
            next = stream.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Err(StreamInterrupted::new(text, e)),
            None => break,
        };

        if chunk.is_empty() {
            continue;
        }

        if let Err(e) = on_chunk(&chunk) {
            return Err(StreamInterrupted::new(text, e));
        }
        text.push_str(&chunk);
    }

    debug!("Stream finished with {} chars", text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::Map;

    fn chunks(parts: &[&str]) -> Vec<Result<String>> {
        parts.iter().map(|p| Ok(p.to_string())).collect()
    }

    #[test]
    fn test_from_parts_text() {
        let completion = Completion::from_parts(Some("Docker is".to_string()), vec![]).unwrap();
        assert_eq!(completion.text(), Some("Docker is"));
        assert!(completion.tool_calls().is_empty());
    }

    #[test]
    fn test_from_parts_prefers_tool_calls() {
        let call = ToolCallRequest::new("call_1", "search", Map::new());
        let completion =
            Completion::from_parts(Some("let me search".to_string()), vec![call.clone()]).unwrap();
        assert_eq!(completion, Completion::ToolCalls(vec![call]));
        assert_eq!(completion.text(), None);
    }

    #[test]
    fn test_from_parts_neither_is_malformed() {
        let err = Completion::from_parts(None, vec![]).unwrap_err();
        assert!(matches!(err, ScoutError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_collect_stream_reconstructs_text() {
        let parts = ["# Docker", "", " is a ", "container", " platform."];
        let mut seen = Vec::new();
        let mut on_chunk = |chunk: &str| -> Result<()> {
            seen.push(chunk.to_string());
            Ok(())
        };

        let text = collect_stream(
            stream::iter(chunks(&parts)),
            &mut on_chunk,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(text, "# Docker is a container platform.");
        assert_eq!(seen.concat(), text);
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn test_collect_stream_error_keeps_partial() {
        let items = vec![
            Ok("partial ".to_string()),
            Ok("report".to_string()),
            Err(ScoutError::Transport("connection reset".to_string())),
            Ok("never seen".to_string()),
        ];
        let mut on_chunk = |_: &str| -> Result<()> { Ok(()) };

        let err = collect_stream(stream::iter(items), &mut on_chunk, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.partial, "partial report");
        assert!(matches!(err.error, ScoutError::Transport(_)));
    }

    #[tokio::test]
    async fn test_collect_stream_callback_aborts() {
        let mut calls = 0;
        let mut on_chunk = |_: &str| -> Result<()> {
            calls += 1;
            if calls == 2 {
                Err(ScoutError::InvalidInput("display closed".to_string()))
            } else {
                Ok(())
            }
        };

        let err = collect_stream(
            stream::iter(chunks(&["a", "b", "c"])),
            &mut on_chunk,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.partial, "a");
        assert!(matches!(err.error, ScoutError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_collect_stream_cancelled_between_chunks() {
        let token = CancellationToken::new();
        let cancel_after_first = token.clone();
        let mut on_chunk = move |_: &str| -> Result<()> {
            cancel_after_first.cancel();
            Ok(())
        };

        let err = collect_stream(stream::iter(chunks(&["first", "second"])), &mut on_chunk, &token)
            .await
            .unwrap_err();

        assert_eq!(err.partial, "first");
        assert!(matches!(err.error, ScoutError::Cancelled));
    }
}
