//! Research pipeline: search → extract → fetch → summarize.
//!
//! Each stage runs its own agent with a fresh conversation and the stage's
//! configuration. Stage failures are tagged with the stage they came from.

use crate::agent::{
    AgentConfig, AgentOutcome, ExtractedRecord, ExtractionAgent, SummaryAgent, ToolCallingAgent,
};
use crate::completion::{ChunkHandler, CompletionClient, OpenAICompletionClient};
use crate::config::{FetchMode, Prompts, Settings};
use crate::conversation::Conversation;
use crate::error::{Result, ScoutError, Stage};
use crate::mcp::McpClient;
use crate::tools::{ToolCallResult, ToolRegistry};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Outcome of the fetch stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    /// Page contents in record order.
    pub contents: Vec<String>,
    /// Fetches that failed; reported, never fatal on their own.
    pub failures: Vec<ToolCallResult>,
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    pub query: String,
    pub results: Vec<String>,
    pub records: Vec<ExtractedRecord>,
    pub fetched: FetchReport,
    pub summary: String,
}

/// The research pipeline.
pub struct ResearchPipeline {
    settings: Settings,
    client: Arc<dyn CompletionClient>,
    search_tools: Arc<ToolRegistry>,
    fetch_tools: Arc<ToolRegistry>,
    cancel: CancellationToken,
    _gateway: Option<Arc<McpClient>>,
}

impl ResearchPipeline {
    /// Connect to the model endpoint and the tool gateway named in the settings.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let client: Arc<dyn CompletionClient> =
            Arc::new(OpenAICompletionClient::new(&settings.endpoint)?);

        let gateway = Arc::new(McpClient::spawn(&settings.gateway).await?);
        let search_tools = ToolRegistry::from_gateway(gateway.clone(), &settings.search.tools).await?;
        let fetch_tools = ToolRegistry::from_gateway(gateway.clone(), &settings.fetch.tools).await?;

        let mut pipeline =
            Self::with_components(settings, client, Arc::new(search_tools), Arc::new(fetch_tools));
        pipeline._gateway = Some(gateway);
        Ok(pipeline)
    }

    /// Create a pipeline with custom components.
    pub fn with_components(
        settings: Settings,
        client: Arc<dyn CompletionClient>,
        search_tools: Arc<ToolRegistry>,
        fetch_tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            settings,
            client,
            search_tools,
            fetch_tools,
            cancel: CancellationToken::new(),
            _gateway: None,
        }
    }

    /// Abort whichever stage is running when the token fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn prompts(&self) -> &Prompts {
        &self.settings.prompts
    }

    /// Run the search tools for a query and return their raw outputs.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        self.search_inner(query)
            .await
            .map_err(|e| e.in_stage(Stage::Search))
    }

    async fn search_inner(&self, query: &str) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            return Err(ScoutError::InvalidInput("empty query".to_string()));
        }

        let outcome = self.search_agent(query).run().await?;
        if let AgentOutcome::ToolResults(results) = &outcome {
            if !results.is_empty() && results.iter().all(|r| !r.is_success()) {
                return Err(first_failure(results));
            }
        }

        let outputs = outcome.outputs();
        info!("Search returned {} result block(s)", outputs.len());
        Ok(outputs)
    }

    /// Extract structured records from the search output.
    #[instrument(skip_all, fields(sources = results.len()))]
    pub async fn extract(&self, results: &[String]) -> Result<Vec<ExtractedRecord>> {
        let agent = ExtractionAgent::new(self.client.clone(), self.settings.extract.agent_config())
            .with_cancellation(self.cancel.clone());

        agent
            .extract_search_results(results, &self.prompts().extract_instruction)
            .await
            .map_err(|e| e.in_stage(Stage::Extract))
    }

    /// Fetch the page behind every record.
    #[instrument(skip_all, fields(records = records.len(), mode = %self.settings.fetch.mode))]
    pub async fn fetch(&self, records: &[ExtractedRecord]) -> Result<FetchReport> {
        if records.is_empty() {
            info!("No records to fetch");
            return Ok(FetchReport::default());
        }

        let report = match self.settings.fetch.mode {
            FetchMode::Batch => self.fetch_batch(records).await,
            FetchMode::PerUrl => self.fetch_per_url(records).await,
        }
        .map_err(|e| e.in_stage(Stage::Fetch))?;

        if !report.failures.is_empty() {
            warn!("{} fetch(es) failed", report.failures.len());
        }
        if report.contents.is_empty() {
            let message = report
                .failures
                .first()
                .and_then(|f| f.error.clone())
                .unwrap_or_else(|| "no page could be fetched".to_string());
            return Err(ScoutError::ToolExecution {
                tool: "fetch".to_string(),
                message,
            }
            .in_stage(Stage::Fetch));
        }

        Ok(report)
    }

    /// One prompt listing every URL; the model issues all fetch calls in one turn.
    async fn fetch_batch(&self, records: &[ExtractedRecord]) -> Result<FetchReport> {
        let prompt: String = records
            .iter()
            .map(|r| render(&self.prompts().fetch_batch_line, &[("url", r.url.as_str())]))
            .collect();

        let mut agent = self.tool_agent(
            self.fetch_tools.clone(),
            self.settings.fetch.agent_config(),
            Conversation::from_user(prompt),
        );

        let mut report = FetchReport::default();
        match agent.run().await? {
            AgentOutcome::ToolResults(results) => {
                for result in results {
                    if result.is_success() {
                        report.contents.push(result.output);
                    } else {
                        report.failures.push(result);
                    }
                }
            }
            AgentOutcome::Answered(_) => warn!("Model answered without fetching"),
        }
        Ok(report)
    }

    /// One round per record; the conversation is replaced between rounds.
    async fn fetch_per_url(&self, records: &[ExtractedRecord]) -> Result<FetchReport> {
        let mut agent = self.tool_agent(
            self.fetch_tools.clone(),
            self.settings.fetch.agent_config(),
            Conversation::new(),
        );

        let mut report = FetchReport::default();
        for record in records {
            agent.reset_conversation(Conversation::seeded(
                render(&self.prompts().fetch_url, &[("url", record.url.as_str())]),
                self.prompts().fetch_instruction.clone(),
            ));

            let results = match agent.run().await? {
                AgentOutcome::ToolResults(results) => results,
                AgentOutcome::Answered(_) => {
                    warn!("Model answered without fetching {}", record.url);
                    continue;
                }
            };

            let (ok, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.is_success());
            report.failures.extend(failed);
            if let Some(page) = ok.into_iter().next() {
                report.contents.push(render(
                    &self.prompts().fetched_page,
                    &[
                        ("title", record.title.as_str()),
                        ("url", record.url.as_str()),
                        ("content", page.output.as_str()),
                    ],
                ));
            }
        }
        Ok(report)
    }

    /// Stream a report over the fetched contents.
    ///
    /// When the stream breaks, the error is a [`ScoutError::Interrupted`] carrying
    /// the text delivered before the break.
    #[instrument(skip_all, fields(sources = contents.len()))]
    pub async fn summarize(
        &self,
        contents: &[String],
        instruction: &str,
        on_chunk: &mut ChunkHandler<'_>,
    ) -> Result<String> {
        let agent = SummaryAgent::new(self.client.clone(), self.settings.summarize.agent_config())
            .with_cancellation(self.cancel.clone());

        agent
            .summarize(contents, instruction, on_chunk)
            .await
            .map_err(|interrupted| {
                warn!("Summary stopped after {} chars", interrupted.partial.len());
                ScoutError::from(interrupted).in_stage(Stage::Summarize)
            })
    }

    /// Run every stage in order.
    #[instrument(skip(self, on_chunk))]
    pub async fn run(&self, query: &str, on_chunk: &mut ChunkHandler<'_>) -> Result<ResearchReport> {
        let results = self.search(query).await?;
        let records = self.extract(&results).await?;
        let fetched = self.fetch(&records).await?;
        let summary = if fetched.contents.is_empty() {
            warn!("Extraction found no results, skipping the summary");
            String::new()
        } else {
            self.summarize(&fetched.contents, &self.prompts().summary_instruction, on_chunk)
                .await?
        };

        Ok(ResearchReport {
            query: query.to_string(),
            results,
            records,
            fetched,
            summary,
        })
    }

    /// Tool-calling agent for the search stage, seeded with the query.
    pub fn search_agent(&self, query: &str) -> ToolCallingAgent {
        self.tool_agent(
            self.search_tools.clone(),
            self.settings.search.agent_config(),
            Conversation::from_user(query),
        )
    }

    fn tool_agent(
        &self,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
        conversation: Conversation,
    ) -> ToolCallingAgent {
        ToolCallingAgent::new(self.client.clone(), tools, config, conversation)
            .with_cancellation(self.cancel.clone())
    }
}

fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let vars: HashMap<&str, &str> = vars.iter().copied().collect();
    Prompts::render(template, &vars)
}

fn first_failure(results: &[ToolCallResult]) -> ScoutError {
    let failed = results.iter().find(|r| !r.is_success());
    ScoutError::ToolExecution {
        tool: failed.map(|r| r.tool_name.clone()).unwrap_or_default(),
        message: failed.and_then(|r| r.error.clone()).unwrap_or_default(),
    }
}
