//! Local Ollama provider
//!
//! Talks to `/api/generate` on an Ollama server (`OLLAMA_HOST`, default
//! `http://localhost:11434`) with a low temperature for consistent output.

use super::data::Script;
use super::error::{PipelineError, PipelineResult};
use super::openai::status_error;
use super::translator::{WordTranslator, build_prompt, extract_word_map};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    model: String,
    client: reqwest::Client,
    base_url: String,
    name: String,
}

impl OllamaProvider {
    pub const DEFAULT_MODEL: &'static str = "qwen2.5:14b";
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";
    const TEMPERATURE: f64 = 0.1;
    const TOP_P: f64 = 0.9;
    const NUM_CTX: u32 = 4096;

    pub fn new(base_url: &str, model: &str, timeout: Duration) -> PipelineResult<Self> {
        if model.trim().is_empty() {
            return Err(PipelineError::Config("Ollama model cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            model: model.to_string(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            name: format!("ollama:{}", model),
        })
    }

    /// Create a provider for `OLLAMA_HOST` with the default model
    pub fn from_env() -> PipelineResult<Self> {
        let base_url =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        Self::new(&base_url, Self::DEFAULT_MODEL, Duration::from_secs(600))
    }

    fn request_body(&self, words: &[String], script: Script) -> Value {
        json!({
            "model": self.model,
            "prompt": build_prompt(words, script),
            "stream": false,
            "options": {
                "temperature": Self::TEMPERATURE,
                "top_p": Self::TOP_P,
                "num_ctx": Self::NUM_CTX
            }
        })
    }

    fn parse_generation(body: &Value) -> PipelineResult<HashMap<String, String>> {
        let text = body["response"].as_str().ok_or_else(|| {
            PipelineError::MalformedResponse("Missing 'response' in generation".to_string())
        })?;
        extract_word_map(text)
    }
}

#[async_trait]
impl WordTranslator for OllamaProvider {
    async fn translate_words(
        &self,
        words: &[String],
        script: Script,
    ) -> PipelineResult<HashMap<String, String>> {
        if words.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.request_body(words, script))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("Ollama", status, &error_text));
        }

        let body: Value = response.json().await?;
        Self::parse_generation(&body)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
