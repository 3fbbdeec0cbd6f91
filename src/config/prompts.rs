//! Prompt templates for Scout.
//!
//! Templates use `{{name}}` placeholders and can be overridden in the `[prompts]`
//! section of the configuration file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// User instruction for the extraction stage.
    pub extract_instruction: String,
    /// One line per URL in a batch fetch prompt.
    pub fetch_batch_line: String,
    /// System message for a single-URL fetch round.
    pub fetch_url: String,
    /// User message for a single-URL fetch round.
    pub fetch_instruction: String,
    /// Layout of one fetched page handed to the summarizer.
    pub fetched_page: String,
    /// User instruction for the report.
    pub summary_instruction: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            extract_instruction: "give me the list of the results.".to_string(),
            fetch_batch_line: "Fetch this URL: {{url}}\n".to_string(),
            fetch_url: "Fetch the url {{url}}".to_string(),
            fetch_instruction: "give me the content of the page.".to_string(),
            fetched_page: "Title: {{title}}\nURL: {{url}}\nContent: {{content}}\n".to_string(),
            summary_instruction: r#"/no_think [Brief]
Make a clear, and structured summary with the provided information.
- Use markdown format.
- Provide only verified references (URLs).
- Stay focused and do not repeat the same information.
- Do not use any other external information.
- Do not include the error messages in the report."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<&str, &str>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}
