//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TextGenerator;
use crate::config::ProviderSettings;
use crate::error::{Error, Result};

const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiGenerator {
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenAiGenerator {
    /// Build from provider settings, reading the key from `OPENAI_API_KEY`
    /// when the settings carry none
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        let api_key = resolve_api_key(settings.api_key.as_deref(), std::env::var(API_KEY_ENV).ok())?;
        Ok(Self::new(settings, api_key))
    }

    pub fn new(settings: &ProviderSettings, api_key: impl Into<String>) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn build_request_body(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Single request, no retry; the first choice's content, trimmed
    pub async fn try_generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(prompt);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::llm(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!("OpenAI API error {status}: {body_text}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse OpenAI response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::llm("No choices in OpenAI response"))?;

        Ok(choice.message.content.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(text) => {
                debug!(model = %self.model, chars = text.len(), "Generated completion");
                text
            }
            Err(e) => {
                warn!(model = %self.model, error = %e, "Text generation failed");
                String::new()
            }
        }
    }
}

fn resolve_api_key(explicit: Option<&str>, from_env: Option<String>) -> Result<String> {
    explicit
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or(from_env.filter(|key| !key.is_empty()))
        .ok_or_else(|| {
            Error::config(format!(
                "API key not found. Provide it in the config or set {API_KEY_ENV}."
            ))
        })
}
