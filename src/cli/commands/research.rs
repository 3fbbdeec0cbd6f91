//! Research command implementation.

use crate::cli::Output;
use crate::config::{FetchMode, Settings};
use crate::error::Result as ScoutResult;
use crate::pipeline::{ResearchPipeline, ResearchReport};
use anyhow::Result;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Run the full research pipeline, streaming the report to stdout.
pub async fn run_research(
    query: &str,
    instruction: Option<String>,
    fetch_mode: Option<FetchMode>,
    json: bool,
    mut settings: Settings,
    cancel: CancellationToken,
) -> Result<()> {
    if let Some(mode) = fetch_mode {
        settings.fetch.mode = mode;
    }
    let instruction = instruction.unwrap_or_else(|| settings.prompts.summary_instruction.clone());

    let spinner = Output::spinner("Starting tool gateway...");
    let pipeline = ResearchPipeline::connect(settings).await;
    spinner.finish_and_clear();
    let pipeline = pipeline?.with_cancellation(cancel);

    let spinner = Output::spinner(&format!("Searching for \"{}\"...", query));
    let results = pipeline.search(query).await;
    spinner.finish_and_clear();
    let results = results?;
    Output::info(&format!("Search returned {} result block(s)", results.len()));

    let spinner = Output::spinner("Extracting results...");
    let records = pipeline.extract(&results).await;
    spinner.finish_and_clear();
    let records = records?;
    Output::info(&format!("Extracted {} result(s)", records.len()));
    if records.is_empty() {
        Output::warning("No results to fetch");
        return Ok(());
    }

    let spinner = Output::spinner(&format!(
        "Fetching {} page(s) ({})...",
        records.len(),
        pipeline.settings().fetch.mode
    ));
    let fetched = pipeline.fetch(&records).await;
    spinner.finish_and_clear();
    let fetched = fetched?;
    for failure in &fetched.failures {
        Output::warning(&format!("Fetch failed: {}", failure.output));
    }
    Output::info(&format!("Fetched {} page(s)", fetched.contents.len()));

    let mut stdout = std::io::stdout();
    let mut on_chunk = |chunk: &str| -> ScoutResult<()> {
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()?;
        Ok(())
    };

    let summary = pipeline
        .summarize(&fetched.contents, &instruction, &mut on_chunk)
        .await;
    println!();
    let summary = summary?;
    Output::success("Report complete");

    if json {
        let report = ResearchReport {
            query: query.to_string(),
            results,
            records,
            fetched,
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
