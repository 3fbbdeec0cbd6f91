//! Streaming summarization of collected text.

use super::AgentConfig;
use crate::completion::{ChunkHandler, CompletionClient, StreamInterrupted};
use crate::conversation::Conversation;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Agent that streams a free-text report over a set of sources.
pub struct SummaryAgent {
    client: Arc<dyn CompletionClient>,
    config: AgentConfig,
    cancel: CancellationToken,
}

impl SummaryAgent {
    pub fn new(client: Arc<dyn CompletionClient>, config: AgentConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Stream a summary of `sources` following `instruction`.
    ///
    /// Each chunk is handed to `on_chunk` as it arrives; the full text is returned.
    /// On failure the text received so far is kept in the error.
    pub async fn summarize<S: AsRef<str>>(
        &self,
        sources: &[S],
        instruction: &str,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<String, StreamInterrupted> {
        let conversation = Conversation::from_sources(sources, instruction);
        info!("Summarizing {} source(s) with {}", sources.len(), self.config.model);

        self.client
            .complete_stream(&conversation, &self.config, on_chunk, &self.cancel)
            .await
    }
}
