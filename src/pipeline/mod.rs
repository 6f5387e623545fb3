/// Word-level Resolution Pipeline
///
/// This module fills in the word-by-word ("literal-rigid") translation of a
/// Greek/Hebrew corpus and rebuilds verse-level text from it.
///
/// # Overview
///
/// Every unresolved token goes through a fixed sequence of tiers:
///
/// 1. **Keep-Original Registry** - divine names and sacred proper nouns stay in the original script
/// 2. **Glossary Cache** - curated and learned word → translation entries, looked up by canonical key
/// 3. **Pattern Matcher** - data-driven regex families for morphological variants
/// 4. **Batch Orchestrator** - deduplicated words sent to an AI service in bounded, retried groups
///
/// Answers from the service are learned into the glossary, so the next run
/// resolves them locally. The **Aggregation Engine** then renders each verse
/// from its tokens, in position order.
///
/// # Example
///
/// ```ignore
/// use interlinear::pipeline::{Lexicon, MemoryStore, RunConfig, ServiceConfig, run};
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicBool;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::load_json("corpus.json".as_ref())?;
///     let mut lexicon = Lexicon::load(".".as_ref())?;
///     let config = RunConfig { scope: "JHN".into(), ..RunConfig::default() };
///     let translator = ServiceConfig::from_env().build_translator()?;
///
///     let stats = run(&config, &mut lexicon, &store, translator.as_ref(), Arc::new(AtomicBool::new(false))).await?;
///     println!("{}", stats);
///     Ok(())
/// }
/// ```
pub mod aggregate;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod glossary;
pub mod keep_original;
pub mod mock;
pub mod normalize;
pub mod ollama;
pub mod openai;
pub mod orchestrator;
pub mod patterns;
pub mod report;
pub mod retry;
pub mod run;
pub mod store;
pub mod translator;

pub use aggregate::{AggregationEngine, DEFAULT_LAYER, REBUILD_SOURCE, RebuildStats, render_literal};
pub use config::{ProviderKind, RunConfig, ServiceConfig};
pub use data::{
    Book, GlossaryEntry, GlossaryOrigin, ResolutionResult, ResolutionTier, RunStats, Script, Token,
    TranslationState, Verse, VerseAggregate,
};
pub use engine::ResolutionEngine;
pub use error::{PipelineError, PipelineResult};
pub use glossary::{GlossaryCache, GlossarySet};
pub use keep_original::{DEFAULT_KEEP_ORIGINAL, KeepOriginalRegistry};
pub use mock::{MockMode, MockTranslator};
pub use normalize::{canonical_key, clean_punctuation, normalize, strip_combining_marks};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use orchestrator::{BatchOrchestrator, BatchStats};
pub use patterns::{MatchTarget, PatternMatcher, PatternRule, PatternRuleSpec};
pub use report::{UntranslatedReport, WordFrequency, untranslated_report};
pub use retry::{Backoff, RetryPolicy};
pub use run::{Lexicon, run};
pub use store::{Corpus, MemoryStore, Scope, TokenStore, UpdateOutcome, VerseStore};
pub use translator::{WordTranslator, build_prompt, extract_word_map, sanitize_translation};
