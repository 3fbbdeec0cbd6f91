//! Tools command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::mcp::McpClient;
use anyhow::Result;

/// List the tools offered by the gateway and mark the configured ones.
pub async fn run_tools(settings: Settings) -> Result<()> {
    let spinner = Output::spinner("Starting tool gateway...");
    let client = McpClient::spawn(&settings.gateway).await;
    spinner.finish_and_clear();
    let tools = client?.list_tools().await?;

    if tools.is_empty() {
        Output::warning("The gateway offers no tools.");
        return Ok(());
    }

    Output::header(&format!("Gateway tools ({})", tools.len()));
    for tool in &tools {
        let mut stages = Vec::new();
        if settings.search.tools.contains(&tool.name) {
            stages.push("search");
        }
        if settings.fetch.tools.contains(&tool.name) {
            stages.push("fetch");
        }

        let label = if stages.is_empty() {
            tool.name.clone()
        } else {
            format!("{} [{}]", tool.name, stages.join(", "))
        };
        Output::list_item(&label);
        if let Some(description) = tool.description.as_deref().filter(|d| !d.is_empty()) {
            Output::kv("description", description.lines().next().unwrap_or_default());
        }
    }

    for name in settings.search.tools.iter().chain(&settings.fetch.tools) {
        if !tools.iter().any(|t| &t.name == name) {
            Output::warning(&format!("Configured tool '{}' is not offered by the gateway", name));
        }
    }

    Ok(())
}
