//! OpenAI chat-completions provider
//!
//! The provider loads the API key from the `OPENAI_API_KEY` environment
//! variable. Each batch becomes one chat completion whose content is
//! expected to be a flat JSON object.

use super::data::Script;
use super::error::{PipelineError, PipelineResult};
use super::translator::{WordTranslator, build_prompt, extract_word_map};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "Você é um tradutor de texto bíblico palavra por palavra. \
Responda apenas com um objeto JSON plano.";

#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    base_url: String,
    name: String,
}

impl OpenAiProvider {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    const TEMPERATURE: f64 = 0.3;
    const MAX_TOKENS: u32 = 2000;

    pub fn new(api_key: String, model: &str, timeout: Duration) -> PipelineResult<Self> {
        if api_key.trim().is_empty() {
            return Err(PipelineError::Config("OpenAI API key cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: model.to_string(),
            client,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            name: format!("openai:{}", model),
        })
    }

    /// Create a provider from the `OPENAI_API_KEY` environment variable
    pub fn from_env() -> PipelineResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            PipelineError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key, Self::DEFAULT_MODEL, Duration::from_secs(120))
    }

    /// Point at an OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, words: &[String], script: Script) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(words, script) }
            ],
            "temperature": Self::TEMPERATURE,
            "max_tokens": Self::MAX_TOKENS
        })
    }

    /// Pull the word map out of a chat-completions response body
    fn parse_completion(body: &Value) -> PipelineResult<HashMap<String, String>> {
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                PipelineError::MalformedResponse(
                    "Missing 'choices[0].message.content' in completion".to_string(),
                )
            })?;
        extract_word_map(content)
    }
}

/// Map a non-success HTTP status to the error taxonomy
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> PipelineError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT {
        PipelineError::TransientService(format!("{} server error ({}): {}", provider, status, body))
    } else {
        PipelineError::Config(format!("{} client error ({}): {}", provider, status, body))
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl WordTranslator for OpenAiProvider {
    async fn translate_words(
        &self,
        words: &[String],
        script: Script,
    ) -> PipelineResult<HashMap<String, String>> {
        if words.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(words, script))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("OpenAI", status, &error_text));
        }

        let body: Value = response.json().await?;
        Self::parse_completion(&body)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
