//! Agents pairing a completion client with a conversation.
//!
//! - [`ToolCallingAgent`] lets the model request tool invocations and runs them.
//! - [`ExtractionAgent`] produces schema-validated records.
//! - [`SummaryAgent`] streams a free-text report.

mod extraction;
mod summarize;
mod tool_calling;

pub use extraction::{ExtractedRecord, ExtractionAgent, ExtractionSchema};
pub use summarize::SummaryAgent;
pub use tool_calling::{AgentOutcome, ToolCallingAgent};

/// Output shape requested from the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// Free text or tool calls.
    #[default]
    None,
    /// JSON constrained to a schema.
    Schema(ExtractionSchema),
}

/// Generation parameters of an agent. Fixed for the agent's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: Option<f32>,
    /// Let the model request several tool calls per turn and run them concurrently.
    pub parallel_tool_calls: bool,
    pub response_format: ResponseFormat,
}

impl AgentConfig {
    /// Deterministic configuration for a model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            top_p: None,
            parallel_tool_calls: false,
            response_format: ResponseFormat::None,
        }
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }
}
