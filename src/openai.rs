//! OpenAI-compatible client configuration with sensible defaults.

use crate::config::EndpointSettings;
use crate::error::{Result, ScoutError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Placeholder key for local model runners that ignore authentication.
const LOCAL_API_KEY: &str = "scout-local";

/// Create a client for the configured endpoint.
pub fn create_client(endpoint: &EndpointSettings) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(endpoint.timeout_seconds))
        .build()
        .map_err(|e| ScoutError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let api_key = endpoint
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| LOCAL_API_KEY.to_string());

    // async-openai appends "/chat/completions" itself
    let config = OpenAIConfig::new()
        .with_api_base(endpoint.base_url.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
