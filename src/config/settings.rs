//! Configuration settings for Scout.

use super::Prompts;
use crate::agent::{AgentConfig, ResponseFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Docker Model Runner's OpenAI-compatible llama.cpp engine.
const DEFAULT_BASE_URL: &str = "http://model-runner.docker.internal/engines/llama.cpp/v1/";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub endpoint: EndpointSettings,
    pub gateway: GatewaySettings,
    pub search: ToolStageSettings,
    pub extract: StageSettings,
    pub fetch: FetchSettings,
    pub summarize: StageSettings,
    pub prompts: Prompts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            endpoint: EndpointSettings::default(),
            gateway: GatewaySettings::default(),
            search: ToolStageSettings::default(),
            extract: StageSettings::default(),
            fetch: FetchSettings::default(),
            summarize: StageSettings::summarize_defaults(),
            prompts: Prompts::default(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Base URL of an OpenAI-compatible chat completion API.
    pub base_url: String,
    /// API key. Falls back to `OPENAI_API_KEY`; local runners accept any value.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_seconds: 300,
        }
    }
}

/// Tool gateway (MCP over stdio) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Executable that starts the gateway.
    pub command: String,
    /// Arguments passed to the gateway executable.
    pub args: Vec<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            command: "docker".to_string(),
            args: vec!["mcp".to_string(), "gateway".to_string(), "run".to_string()],
        }
    }
}

/// Model settings for a stage without tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    pub model: String,
    pub temperature: f32,
    pub top_p: Option<f32>,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            model: "ai/qwen2.5:3B-F16".to_string(),
            temperature: 0.0,
            top_p: None,
        }
    }
}

impl StageSettings {
    /// Settings for the summarization stage.
    pub fn summarize_defaults() -> Self {
        Self {
            model: "ai/qwen3:latest".to_string(),
            temperature: 0.0,
            top_p: Some(0.3),
        }
    }

    /// Agent configuration for this stage.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            parallel_tool_calls: false,
            response_format: ResponseFormat::None,
        }
    }
}

/// Model and tool settings for a tool-calling stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolStageSettings {
    pub model: String,
    pub temperature: f32,
    pub parallel_tool_calls: bool,
    /// Gateway tools exposed to the model in this stage.
    pub tools: Vec<String>,
}

impl Default for ToolStageSettings {
    fn default() -> Self {
        Self {
            model: "ai/qwen2.5:0.5B-F16".to_string(),
            temperature: 0.0,
            parallel_tool_calls: true,
            // "brave_web_search" works too but needs an API key in the gateway
            tools: vec!["search".to_string()],
        }
    }
}

impl ToolStageSettings {
    /// Agent configuration for this stage.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: None,
            parallel_tool_calls: self.parallel_tool_calls,
            response_format: ResponseFormat::None,
        }
    }
}

/// How the fetch stage asks the model for page fetches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// One prompt listing every URL; the model issues all fetches in one turn.
    #[default]
    Batch,
    /// One agent round per record, with the conversation reset in between.
    PerUrl,
}

impl std::str::FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "batch" => Ok(FetchMode::Batch),
            "per_url" => Ok(FetchMode::PerUrl),
            _ => Err(format!("Unknown fetch mode: {}", s)),
        }
    }
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchMode::Batch => write!(f, "batch"),
            FetchMode::PerUrl => write!(f, "per_url"),
        }
    }
}

/// Fetch stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub model: String,
    pub temperature: f32,
    pub parallel_tool_calls: bool,
    /// Gateway tools exposed to the model in this stage.
    pub tools: Vec<String>,
    pub mode: FetchMode,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            model: "ai/qwen2.5:0.5B-F16".to_string(),
            temperature: 0.0,
            parallel_tool_calls: true,
            tools: vec!["fetch".to_string()],
            mode: FetchMode::Batch,
        }
    }
}

impl FetchSettings {
    /// Agent configuration for this stage.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: None,
            parallel_tool_calls: self.parallel_tool_calls,
            response_format: ResponseFormat::None,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Settings::default())
        }
    }

    /// Parse settings from TOML, filling anything missing from the defaults.
    pub fn from_toml(content: &str) -> crate::error::Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ScoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scout")
            .join("config.toml")
    }
}
