//! MCP (Model Context Protocol) client for the tool gateway.
//!
//! The gateway hosts the concrete tools (web search, page fetch) and runs them on
//! behalf of the model. Scout only speaks the client side of the protocol.

mod client;
pub mod protocol;
mod tool;

pub use client::McpClient;
pub use protocol::RemoteTool;
pub use tool::McpTool;
