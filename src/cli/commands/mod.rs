//! CLI command implementations.

mod config;
mod extract;
mod research;
mod search;
mod tools;

pub use config::run_config;
pub use extract::run_extract;
pub use research::run_research;
pub use search::run_search;
pub use tools::run_tools;
