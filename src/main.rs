//! Scout CLI entry point.

use anyhow::Result;
use clap::Parser;
use scout::cli::{commands, Cli, Commands, Output};
use scout::config::Settings;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_ref().map(PathBuf::from);

    // Load configuration
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging on stderr; stdout carries the report
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("scout={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            Output::warning("Interrupted, stopping...");
            on_interrupt.cancel();
        }
    });

    // Execute command
    match &cli.command {
        Commands::Research {
            query,
            instruction,
            fetch_mode,
            json,
        } => {
            commands::run_research(query, instruction.clone(), *fetch_mode, *json, settings, cancel)
                .await?;
        }

        Commands::Search { query, show_calls } => {
            commands::run_search(query, *show_calls, settings, cancel).await?;
        }

        Commands::Extract { query, json } => {
            commands::run_extract(query, *json, settings, cancel).await?;
        }

        Commands::Tools => {
            commands::run_tools(settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
