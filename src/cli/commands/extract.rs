//! Extract command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::ResearchPipeline;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the extract command.
pub async fn run_extract(
    query: &str,
    json: bool,
    settings: Settings,
    cancel: CancellationToken,
) -> Result<()> {
    let spinner = Output::spinner("Starting tool gateway...");
    let pipeline = ResearchPipeline::connect(settings).await;
    spinner.finish_and_clear();
    let pipeline = pipeline?.with_cancellation(cancel);

    let spinner = Output::spinner("Searching...");
    let results = pipeline.search(query).await;
    spinner.finish_and_clear();
    let results = results?;

    let spinner = Output::spinner("Extracting results...");
    let records = pipeline.extract(&results).await;
    spinner.finish_and_clear();
    let records = records?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        Output::warning("No results could be extracted.");
        return Ok(());
    }

    Output::success(&format!("Extracted {} result(s)", records.len()));
    for record in &records {
        Output::record(&record.title, &record.url, &record.summary);
    }

    Ok(())
}
