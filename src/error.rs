//! Error types for Scout.

use std::fmt;
use thiserror::Error;

/// A stage of the research pipeline, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Extract,
    Fetch,
    Summarize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Search => write!(f, "search"),
            Stage::Extract => write!(f, "extract"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Summarize => write!(f, "summarize"),
        }
    }
}

/// Library-level error type for Scout operations.
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Structured output violates schema: {0}")]
    SchemaViolation(String),

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Agent exceeded maximum rounds ({0})")]
    MaxRounds(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tool gateway error: {0}")]
    Gateway(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("{source} (after {} streamed chars)", .partial.len())]
    Interrupted {
        partial: String,
        #[source]
        source: Box<ScoutError>,
    },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<ScoutError>,
    },
}

impl ScoutError {
    /// Tag this error with the pipeline stage it came from.
    pub fn in_stage(self, stage: Stage) -> Self {
        ScoutError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The stage this error was raised in, if it was tagged.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ScoutError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage tags and stream interruptions removed.
    pub fn root(&self) -> &ScoutError {
        match self {
            ScoutError::Stage { source, .. } | ScoutError::Interrupted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Text streamed before the failure, if the error interrupted a stream.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            ScoutError::Stage { source, .. } => source.partial_output(),
            ScoutError::Interrupted { partial, .. } => Some(partial.as_str()),
            _ => None,
        }
    }

    /// Whether the error stems from a caller-initiated abort.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), ScoutError::Cancelled)
    }
}

impl From<async_openai::error::OpenAIError> for ScoutError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;

        match err {
            OpenAIError::JSONDeserialize(e) => ScoutError::MalformedResponse(e.to_string()),
            OpenAIError::InvalidArgument(msg) => ScoutError::Config(msg),
            other => ScoutError::Transport(other.to_string()),
        }
    }
}

/// Result type alias for Scout operations.
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tag_and_root() {
        let err = ScoutError::Transport("connection refused".to_string()).in_stage(Stage::Search);
        assert_eq!(err.stage(), Some(Stage::Search));
        assert!(matches!(err.root(), ScoutError::Transport(msg) if msg == "connection refused"));
        assert_eq!(
            err.to_string(),
            "search stage failed: Transport error: connection refused"
        );
    }

    #[test]
    fn test_cancelled_detection() {
        assert!(ScoutError::Cancelled.in_stage(Stage::Summarize).is_cancelled());
        assert!(!ScoutError::Transport("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_interrupted_keeps_partial_text() {
        let err = ScoutError::Interrupted {
            partial: "# Docker\n".to_string(),
            source: Box::new(ScoutError::Cancelled),
        }
        .in_stage(Stage::Summarize);

        assert_eq!(err.partial_output(), Some("# Docker\n"));
        assert!(err.is_cancelled());
        assert_eq!(ScoutError::Cancelled.partial_output(), None);
    }

    #[test]
    fn test_openai_error_mapping() {
        let err: ScoutError = async_openai::error::OpenAIError::StreamError("eof".to_string()).into();
        assert!(matches!(err, ScoutError::Transport(_)));

        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ScoutError = async_openai::error::OpenAIError::JSONDeserialize(bad).into();
        assert!(matches!(err, ScoutError::MalformedResponse(_)));
    }
}
