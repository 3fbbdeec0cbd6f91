//! Structured extraction: turn raw text into schema-validated records.

use super::AgentConfig;
use crate::completion::CompletionClient;
use crate::conversation::Conversation;
use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A named JSON Schema the model output must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSchema {
    pub name: String,
    pub description: Option<String>,
    pub schema: Value,
    /// Ask the endpoint for strict schema adherence.
    pub strict: bool,
}

impl ExtractionSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema,
            strict: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Array of `{title, url, summary}` objects, one per search result.
    pub fn search_results() -> Self {
        Self::new(
            "search_results",
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "The first line of the section"
                        },
                        "url": {
                            "type": "string",
                            "description": "The URL of the section"
                        },
                        "summary": {
                            "type": "string",
                            "description": "A short summary of the section"
                        }
                    },
                    "required": ["title", "url", "summary"],
                    "additionalProperties": false
                }
            }),
        )
        .with_description("Notable information about search results")
    }

    /// Check an instance against the schema.
    pub fn validate(&self, instance: &Value) -> Result<()> {
        let validator = jsonschema::validator_for(&self.schema)
            .map_err(|e| ScoutError::Config(format!("invalid schema '{}': {}", self.name, e)))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{} at '{}'", e, e.instance_path))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScoutError::SchemaViolation(errors.join("; ")))
        }
    }
}

/// One search result as extracted by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// Agent that extracts structured records from text.
pub struct ExtractionAgent {
    client: Arc<dyn CompletionClient>,
    config: AgentConfig,
    cancel: CancellationToken,
}

impl ExtractionAgent {
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

    /// Raw JSON text produced under the schema, validated but not deserialized.
    pub async fn extract_json<S: AsRef<str>>(
        &self,
        sources: &[S],
        instruction: &str,
        schema: &ExtractionSchema,
    ) -> Result<Value> {
        let conversation = Conversation::from_sources(sources, instruction);
        debug!(
            "Extracting '{}' from {} source(s)",
            schema.name,
            sources.len()
        );

        let raw = self
            .client
            .complete_structured(&conversation, &self.config, schema, &self.cancel)
            .await?;

        let value: Value = serde_json::from_str(raw.trim()).map_err(|e| {
            ScoutError::SchemaViolation(format!("output is not valid JSON: {}", e))
        })?;
        schema.validate(&value)?;

        Ok(value)
    }

    /// Extract records of type `T` described by `schema`.
    pub async fn extract<T, S>(
        &self,
        sources: &[S],
        instruction: &str,
        schema: &ExtractionSchema,
    ) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
        S: AsRef<str>,
    {
        let value = self.extract_json(sources, instruction, schema).await?;
        let records: Vec<T> = serde_json::from_value(value)
            .map_err(|e| ScoutError::SchemaViolation(e.to_string()))?;

        info!("Extracted {} record(s)", records.len());
        Ok(records)
    }

    /// Extract search result records with the built-in schema.
    pub async fn extract_search_results<S: AsRef<str>>(
        &self,
        sources: &[S],
        instruction: &str,
    ) -> Result<Vec<ExtractedRecord>> {
        self.extract(sources, instruction, &ExtractionSchema::search_results())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::testing::ScriptedClient;

    const SEARCH_OUTPUT: &str = "Docker Docs\nhttps://docs.docker.com\nOfficial documentation.\n\n\
                                 Docker Hub\nhttps://hub.docker.com\nContainer image registry.";

    const RECORDS_JSON: &str = r#"[
        {"title": "Docker Docs", "url": "https://docs.docker.com", "summary": "Official documentation."},
        {"title": "Docker Hub", "url": "https://hub.docker.com", "summary": "Container image registry."}
    ]"#;

    fn agent(client: ScriptedClient) -> ExtractionAgent {
        ExtractionAgent::new(Arc::new(client), AgentConfig::new("ai/qwen2.5:3B-F16"))
    }

    #[test]
    fn test_search_results_schema_shape() {
        let schema = ExtractionSchema::search_results();
        assert_eq!(schema.name, "search_results");
        assert!(schema.strict);
        assert_eq!(schema.schema["type"], "array");
        assert_eq!(
            schema.schema["items"]["required"],
            json!(["title", "url", "summary"])
        );
    }

    #[test]
    fn test_validate_reports_missing_field() {
        let schema = ExtractionSchema::search_results();
        let instance = json!([{"title": "Docker Docs", "summary": "Official documentation."}]);

        let err = schema.validate(&instance).unwrap_err();
        match err {
            ScoutError::SchemaViolation(msg) => assert!(msg.contains("url")),
            other => panic!("Expected SchemaViolation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extracts_records_in_order() {
        let client = ScriptedClient::new().structured_with(RECORDS_JSON);
        let agent = agent(client);

        let records = agent
            .extract_search_results(&[SEARCH_OUTPUT], "give me the list of the results.")
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Docker Docs");
        assert_eq!(records[1].url, "https://hub.docker.com");
    }

    #[tokio::test]
    async fn test_sources_become_system_context() {
        let client = Arc::new(ScriptedClient::new().structured_with("[]"));
        let agent = ExtractionAgent::new(client.clone(), AgentConfig::new("m"));

        let records = agent
            .extract_search_results(&["first", "second"], "list them")
            .await
            .unwrap();
        assert!(records.is_empty());

        let seen = client.conversations();
        assert_eq!(seen.len(), 1);
        let messages = seen[0].messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "first\nsecond");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "list them");
    }

    #[tokio::test]
    async fn test_invalid_json_is_schema_violation() {
        let client = ScriptedClient::new().structured_with("Here are the results: [");
        let err = agent(client)
            .extract_search_results(&[SEARCH_OUTPUT], "list")
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_missing_field_is_schema_violation() {
        let client = ScriptedClient::new()
            .structured_with(r#"[{"title": "Docker Docs", "summary": "Official documentation."}]"#);
        let err = agent(client)
            .extract_search_results(&[SEARCH_OUTPUT], "list")
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_identical_output_gives_identical_records() {
        let client = ScriptedClient::new()
            .structured_with(RECORDS_JSON)
            .structured_with(RECORDS_JSON);
        let agent = agent(client);

        let first = agent.extract_search_results(&[SEARCH_OUTPUT], "list").await.unwrap();
        let second = agent.extract_search_results(&[SEARCH_OUTPUT], "list").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_custom_record_type() {
        #[derive(Debug, Deserialize)]
        struct Release {
            version: String,
        }

        let schema = ExtractionSchema::new(
            "releases",
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"version": {"type": "string"}},
                    "required": ["version"]
                }
            }),
        );
        let client = ScriptedClient::new().structured_with(r#"[{"version": "28.0.1"}]"#);

        let releases: Vec<Release> = agent(client)
            .extract(&["Docker 28.0.1 released"], "list releases", &schema)
            .await
            .unwrap();
        assert_eq!(releases[0].version, "28.0.1");
    }
}
