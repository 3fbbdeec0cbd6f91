//! Search command implementation.

use crate::agent::AgentOutcome;
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::ResearchPipeline;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the search command.
pub async fn run_search(
    query: &str,
    show_calls: bool,
    settings: Settings,
    cancel: CancellationToken,
) -> Result<()> {
    let spinner = Output::spinner("Starting tool gateway...");
    let pipeline = ResearchPipeline::connect(settings).await;
    spinner.finish_and_clear();
    let pipeline = pipeline?.with_cancellation(cancel);

    if !show_calls {
        let spinner = Output::spinner("Searching...");
        let results = pipeline.search(query).await;
        spinner.finish_and_clear();
        print_results(&results?);
        return Ok(());
    }

    let mut agent = pipeline.search_agent(query);

    let spinner = Output::spinner("Asking the model for tool calls...");
    let detected = agent.detect_tool_calls().await;
    spinner.finish_and_clear();
    detected?;

    Output::header("Tool calls");
    println!("{}", agent.tool_calls_json()?);

    let spinner = Output::spinner("Running tools...");
    let results = agent.execute_tool_calls().await;
    spinner.finish_and_clear();
    let results = results?;

    for failed in results.iter().filter(|r| !r.is_success()) {
        Output::warning(&format!("{} failed: {}", failed.tool_name, failed.output));
    }

    let outcome = if results.is_empty() {
        let answer = agent
            .conversation()
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        AgentOutcome::Answered(answer)
    } else {
        AgentOutcome::ToolResults(results)
    };
    print_results(&outcome.outputs());

    Ok(())
}

fn print_results(results: &[String]) {
    if results.is_empty() {
        Output::warning("The search returned nothing.");
        return;
    }

    Output::success(&format!("Found {} result block(s)", results.len()));
    for (i, result) in results.iter().enumerate() {
        Output::tool_output(i + 1, result);
    }
}
