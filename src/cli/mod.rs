//! CLI module for Scout.

pub mod commands;
mod output;

pub use output::Output;

use crate::config::FetchMode;
use clap::{Parser, Subcommand};

/// Scout - Local Research Agent
///
/// Searches the web through an MCP tool gateway, extracts the results, fetches the
/// pages and streams a summarized report, all driven by a local language model.
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SCOUT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic and stream a summarized report
    Research {
        /// What to research
        query: String,

        /// Override the report instruction
        #[arg(short, long)]
        instruction: Option<String>,

        /// How pages are fetched (batch, per-url)
        #[arg(long)]
        fetch_mode: Option<FetchMode>,

        /// Print the full report as JSON after the summary
        #[arg(long)]
        json: bool,
    },

    /// Run the search stage only and print the raw results
    Search {
        /// Search query
        query: String,

        /// Print the tool calls chosen by the model
        #[arg(long)]
        show_calls: bool,
    },

    /// Search and extract structured results
    Extract {
        /// Search query
        query: String,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tools offered by the gateway
    Tools,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_research() {
        let cli = Cli::try_parse_from([
            "scout",
            "-vv",
            "research",
            "latest Docker release",
            "--fetch-mode",
            "per-url",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Research { query, fetch_mode, instruction, json } => {
                assert_eq!(query, "latest Docker release");
                assert_eq!(fetch_mode, Some(FetchMode::PerUrl));
                assert!(instruction.is_none());
                assert!(!json);
            }
            other => panic!("Expected research command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["scout", "--config", "/tmp/scout.toml", "config", "init", "-f"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/scout.toml"));
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigAction::Init { force: true } }
        ));
    }

    #[test]
    fn test_rejects_unknown_fetch_mode() {
        let result = Cli::try_parse_from(["scout", "research", "q", "--fetch-mode", "sometimes"]);
        assert!(result.is_err());
    }
}
