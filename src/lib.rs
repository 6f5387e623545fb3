//! Tiered word-by-word translation for Greek and Hebrew interlinear corpora
//!
//! Tokens are resolved through a keep-original registry, per-script
//! glossaries, pattern families and, as a last resort, an AI translation
//! service whose answers are learned back into the glossaries. Verse texts
//! are rebuilt from token state on demand.

pub mod pipeline;

// Re-export the types most callers need
pub use pipeline::{
    AggregationEngine, GlossaryCache, GlossarySet, KeepOriginalRegistry, Lexicon, MemoryStore,
    PatternMatcher, PipelineError, PipelineResult, ResolutionEngine, RunConfig, RunStats, Scope,
    Script, ServiceConfig, Token, TokenStore, VerseStore, WordTranslator, run,
};
