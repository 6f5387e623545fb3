//! Mock word translator for testing
//!
//! Deterministic, network-free stand-in for the AI translation service,
//! with modes that simulate the service's failure behaviors.
//!
//! # Example
//!
//! ```ignore
//! use interlinear::pipeline::{MockMode, MockTranslator, Script, WordTranslator};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockTranslator::new(MockMode::Suffix);
//!     let map = mock.translate_words(&["λόγος".to_string()], Script::Greek).await.unwrap();
//!     assert_eq!(map["λόγος"], "λόγος_pt");
//! }
//! ```

use super::data::Script;
use super::error::{PipelineError, PipelineResult};
use super::translator::{WordTranslator, extract_word_map};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append a target suffix: "λόγος" → "λόγος_pt"
    Suffix,

    /// Predefined word → translation pairs; unknown words are omitted
    Mappings(HashMap<String, String>),

    /// Fail the first `n` calls with a transient error, then behave like `Mappings`
    Flaky(usize, HashMap<String, String>),

    /// Every call fails with a transient error
    Error(String),

    /// Answer with text that is not a JSON object
    Garbage,
}

#[derive(Debug)]
pub struct MockTranslator {
    mode: MockMode,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self::with_delay(mode, 0)
    }

    /// Create a MockTranslator with simulated network delay
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            mode,
            delay_ms,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `translate_words` calls so far, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn mapped(words: &[String], map: &HashMap<String, String>) -> HashMap<String, String> {
        words
            .iter()
            .filter_map(|w| map.get(w).map(|t| (w.clone(), t.clone())))
            .collect()
    }
}

#[async_trait]
impl WordTranslator for MockTranslator {
    async fn translate_words(
        &self,
        words: &[String],
        _script: Script,
    ) -> PipelineResult<HashMap<String, String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        match &self.mode {
            MockMode::Suffix => Ok(words.iter().map(|w| (w.clone(), format!("{}_pt", w))).collect()),
            MockMode::Mappings(map) => Ok(Self::mapped(words, map)),
            MockMode::Flaky(failures, map) => {
                if call < *failures {
                    Err(PipelineError::TransientService(format!(
                        "simulated failure {} of {}",
                        call + 1,
                        failures
                    )))
                } else {
                    Ok(Self::mapped(words, map))
                }
            }
            MockMode::Error(msg) => Err(PipelineError::TransientService(msg.clone())),
            MockMode::Garbage => extract_word_map("Desculpe, não posso ajudar com isso."),
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
