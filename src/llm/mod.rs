//! Text generation service used by the enhance and summarize operations

mod openai;

pub use openai::OpenAiGenerator;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// A service turning a prompt into a completion.
///
/// Implementations swallow their own failures and return an empty string, so
/// callers cannot tell "service failed" from "service answered nothing".
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> String;
}

/// Prompt asking the service to flesh out a memory
pub fn enhance_prompt(text: &str) -> String {
    format!("Enhance the following memory with additional relevant details:\n\n{text}")
}

/// Prompt asking the service to summarize memories, one per line
pub fn summary_prompt<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    let lines: Vec<&str> = texts.into_iter().collect();
    format!("Summarize the following memories:\n\n{}", lines.join("\n"))
}

/// Build the generator named by `config.provider`
pub fn build_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::from_settings(&config.config)?)),
        other => Err(Error::config(format!("Unsupported LLM provider: {other}"))),
    }
}
