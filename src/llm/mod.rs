//! Language-model integration module.
//!
//! Provides the two-channel gateway (native sampling vs. HTTP completion),
//! the OpenAI-compatible client, and the prompt templates.

mod client;
mod gateway;
mod prompts;

pub use client::HttpCompletionClient;
pub use gateway::{
    parse_ocr_response, LanguageModelGateway, NativeSampler, OcrOutcome, PromptPart,
};
pub use prompts::Prompts;

/// Extract JSON from a potentially markdown-wrapped model response.
pub(crate) fn extract_json(response: &str) -> String {
    let response = response.trim();

    // Check for ```json code block
    if response.starts_with("```json") {
        if let Some(end) = response.rfind("```") {
            let start = "```json".len();
            if end > start {
                return response[start..end].trim().to_string();
            }
        }
    }

    // Check for ``` code block
    if response.starts_with("```") {
        if let Some(end) = response.rfind("```") {
            let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
            if end > start {
                return response[start..end].trim().to_string();
            }
        }
    }

    // Find JSON object or array
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return response[start..=end].to_string();
            }
        }
    }

    if let Some(start) = response.find('[') {
        if let Some(end) = response.rfind(']') {
            if end > start {
                return response[start..=end].to_string();
            }
        }
    }

    response.to_string()
}
