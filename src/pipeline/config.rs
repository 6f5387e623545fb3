//! Run and translation-service configuration
//!
//! Settings come from an optional JSON file; environment variables fill in
//! whatever the file leaves out (`OPENAI_API_KEY`, `OLLAMA_HOST`,
//! `INTERLINEAR_MODEL`), and CLI flags override both.

use super::error::{PipelineError, PipelineResult};
use super::mock::{MockMode, MockTranslator};
use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;
use super::retry::RetryPolicy;
use super::translator::WordTranslator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
    Mock,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => OpenAiProvider::DEFAULT_MODEL,
            ProviderKind::Ollama => OllamaProvider::DEFAULT_MODEL,
            ProviderKind::Mock => "mock",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Mock => "mock",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> PipelineResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(PipelineError::Config(format!(
                "Unknown provider '{}' (expected openai, ollama or mock)",
                other
            ))),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub retry: RetryPolicy,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("retry", &self.retry)
            .finish()
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.fill_from_env();
        config
    }

    /// Fill unset fields from the environment
    pub fn fill_from_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("INTERLINEAR_MODEL").ok();
        }
        if self.base_url.is_none() && self.provider == ProviderKind::Ollama {
            self.base_url = std::env::var("OLLAMA_HOST").ok();
        }
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Construct the configured translation backend
    pub fn build_translator(&self) -> PipelineResult<Box<dyn WordTranslator>> {
        let timeout = self.retry.timeout();
        match self.provider {
            ProviderKind::OpenAi => {
                let api_key = self.api_key.clone().ok_or_else(|| {
                    PipelineError::Config(
                        "OpenAI provider needs an API key (set OPENAI_API_KEY)".to_string(),
                    )
                })?;
                let mut provider = OpenAiProvider::new(api_key, self.model(), timeout)?;
                if let Some(base_url) = &self.base_url {
                    provider = provider.with_base_url(base_url);
                }
                Ok(Box::new(provider))
            }
            ProviderKind::Ollama => {
                let base_url = self
                    .base_url
                    .as_deref()
                    .unwrap_or(OllamaProvider::DEFAULT_BASE_URL);
                Ok(Box::new(OllamaProvider::new(base_url, self.model(), timeout)?))
            }
            ProviderKind::Mock => Ok(Box::new(MockTranslator::new(MockMode::Suffix))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// `ALL` or a book code
    pub scope: String,
    /// Unique words per service call
    pub batch_size: usize,
    /// Flush the glossaries every N groups; 0 flushes only at the end
    pub flush_every: usize,
    /// Pause between service calls
    pub batch_delay_ms: u64,
    /// Tokens fetched from the store at a time
    pub page_size: usize,
    pub service: ServiceConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scope: "ALL".to_string(),
            batch_size: 10,
            flush_every: 0,
            batch_delay_ms: 500,
            page_size: 1000,
            service: ServiceConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("Invalid config '{}': {}", path.display(), e))
        })
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}
