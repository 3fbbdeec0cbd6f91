//! Scout - Local Research Agent
//!
//! Turns a research query into a cited, summarized report by driving a language
//! model through tool calls, structured extraction and streaming generation.
//!
//! # Overview
//!
//! A research run has four stages:
//! - **search**: the model picks web search tool calls, which the tool gateway executes
//! - **extract**: the raw results are turned into validated `{title, url, summary}` records
//! - **fetch**: the model requests a page fetch for every record
//! - **summarize**: the fetched pages are summarized into a streamed markdown report
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `conversation` - Message history handed to the model
//! - `completion` - Completion client over an OpenAI-compatible endpoint
//! - `tools` - Tool trait, registry and batch execution
//! - `agent` - Tool-calling, extraction and summarization agents
//! - `mcp` - Client for the MCP tool gateway
//! - `pipeline` - Stage coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use scout::config::Settings;
//! use scout::pipeline::ResearchPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = ResearchPipeline::connect(settings).await?;
//!
//!     let mut print = |chunk: &str| -> scout::Result<()> {
//!         print!("{}", chunk);
//!         Ok(())
//!     };
//!     let report = pipeline.run("latest Docker release", &mut print).await?;
//!     println!("\n{} sources", report.fetched.contents.len());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cancel;
pub mod cli;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod mcp;
pub mod openai;
pub mod pipeline;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, ScoutError, Stage};
