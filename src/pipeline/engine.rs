//! Tiered per-token resolution
//!
//! Strict order, first success wins:
//!
//! 1. keep-original registry (exact surface form)
//! 2. glossary lookup on the canonical key
//! 3. pattern families on the same key
//! 4. otherwise `Unresolved`, to be sent to the batch orchestrator
//!
//! The engine only reads its collaborators; it never writes tokens or
//! glossaries.

use super::data::{ResolutionResult, ResolutionTier, Token};
use super::glossary::GlossarySet;
use super::keep_original::KeepOriginalRegistry;
use super::normalize::{canonical_key, clean_punctuation};
use super::patterns::PatternMatcher;

pub struct ResolutionEngine<'a> {
    keep_original: &'a KeepOriginalRegistry,
    glossaries: &'a GlossarySet,
    patterns: &'a PatternMatcher,
}

impl<'a> ResolutionEngine<'a> {
    pub fn new(
        keep_original: &'a KeepOriginalRegistry,
        glossaries: &'a GlossarySet,
        patterns: &'a PatternMatcher,
    ) -> Self {
        Self {
            keep_original,
            glossaries,
            patterns,
        }
    }

    pub fn resolve(&self, token: &Token) -> ResolutionResult {
        let surface = token.surface_text.as_str();

        if self.keep_original.is_kept(surface) || self.keep_original.is_kept(&clean_punctuation(surface)) {
            return ResolutionResult::resolved(surface, ResolutionTier::KeepOriginal);
        }

        let key = canonical_key(surface, token.script);
        if key.is_empty() {
            return ResolutionResult::unresolved();
        }

        if let Some(translation) = self.glossaries.for_script(token.script).lookup(&key) {
            return ResolutionResult::resolved(translation, ResolutionTier::Glossary);
        }

        if let Some(translation) = self.patterns.find_match(token.script, surface, &key) {
            return ResolutionResult::resolved(translation, ResolutionTier::Pattern);
        }

        ResolutionResult::unresolved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::data::Script;
    use crate::pipeline::patterns::PatternRuleSpec;

    struct Fixture {
        keep: KeepOriginalRegistry,
        glossaries: GlossarySet,
        patterns: PatternMatcher,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                keep: KeepOriginalRegistry::with_defaults(),
                glossaries: GlossarySet::in_memory(),
                patterns: PatternMatcher::empty(),
            }
        }

        fn engine(&self) -> ResolutionEngine<'_> {
            ResolutionEngine::new(&self.keep, &self.glossaries, &self.patterns)
        }
    }

    fn greek(word: &str) -> Token {
        Token::unresolved(1, 1, 1, Script::Greek, word)
    }

    fn hebrew(word: &str) -> Token {
        Token::unresolved(1, 1, 1, Script::Hebrew, word)
    }

    // ========== Keep-original ==========

    #[test]
    fn test_keep_original_beats_conflicting_glossary_entry() {
        let mut fx = Fixture::new();
        fx.glossaries.greek.add_curated("Θεός", "deus");
        fx.patterns = PatternMatcher::from_specs(&[PatternRuleSpec::new("Θεός", "divindade")]).unwrap();

        let result = fx.engine().resolve(&greek("Θεός"));
        assert_eq!(result.translation.as_deref(), Some("Θεός"));
        assert_eq!(result.tier, ResolutionTier::KeepOriginal);
    }

    #[test]
    fn test_keep_original_returns_surface_unchanged_with_punctuation() {
        let fx = Fixture::new();
        let result = fx.engine().resolve(&greek("Θεοῦ,"));
        assert_eq!(result.translation.as_deref(), Some("Θεοῦ,"));
        assert_eq!(result.tier, ResolutionTier::KeepOriginal);
    }

    #[test]
    fn test_default_patterns_never_translate_kept_names() {
        let mut fx = Fixture::new();
        fx.patterns = PatternMatcher::with_defaults().unwrap();

        let engine = fx.engine();
        assert_eq!(engine.resolve(&hebrew("אֱלֹהִים")).tier, ResolutionTier::KeepOriginal);
        let marked = engine.resolve(&hebrew("אֱלֹהִ֑ים"));
        assert_ne!(marked.tier, ResolutionTier::Pattern);
        assert_ne!(marked.translation.as_deref(), Some("Deus"));
    }

    // ========== Glossary vs pattern ==========

    #[test]
    fn test_glossary_takes_precedence_over_pattern() {
        let mut fx = Fixture::new();
        fx.glossaries.greek.add_curated("λόγος", "palavra");
        fx.patterns = PatternMatcher::from_specs(&[PatternRuleSpec::new("λόγος", "verbo")]).unwrap();

        let result = fx.engine().resolve(&greek("λόγος"));
        assert_eq!(result.translation.as_deref(), Some("palavra"));
        assert_eq!(result.tier, ResolutionTier::Glossary);
    }

    #[test]
    fn test_pattern_used_when_glossary_misses() {
        let mut fx = Fixture::new();
        fx.patterns = PatternMatcher::with_defaults().unwrap();

        let result = fx.engine().resolve(&hebrew("הַמֶּ֔לֶךְ"));
        assert_eq!(result.translation.as_deref(), Some("o-rei"));
        assert_eq!(result.tier, ResolutionTier::Pattern);
    }

    #[test]
    fn test_unresolved_when_nothing_matches() {
        let fx = Fixture::new();
        let result = fx.engine().resolve(&greek("λόγος"));
        assert_eq!(result, ResolutionResult::unresolved());
        assert!(!result.is_resolved());
    }

    #[test]
    fn test_punctuation_only_token_is_unresolved() {
        let fx = Fixture::new();
        assert_eq!(fx.engine().resolve(&greek("·")).tier, ResolutionTier::Unresolved);
    }

    // ========== Normalization asymmetry ==========

    #[test]
    fn test_hebrew_cantillation_variants_share_glossary_entry() {
        let mut fx = Fixture::new();
        fx.glossaries.hebrew.add_curated("שָׁנָה", "ano");

        let engine = fx.engine();
        let marked = engine.resolve(&hebrew("שָׁנָ֔ה"));
        let bare = engine.resolve(&hebrew("שָׁנָה"));
        assert_eq!(marked.translation.as_deref(), Some("ano"));
        assert_eq!(marked, bare);
    }

    #[test]
    fn test_greek_accent_variants_do_not_share_glossary_entry() {
        let mut fx = Fixture::new();
        fx.glossaries.greek.add_curated("λόγος", "palavra");

        let engine = fx.engine();
        assert_eq!(engine.resolve(&greek("λόγος")).tier, ResolutionTier::Glossary);
        assert_eq!(engine.resolve(&greek("λογος")).tier, ResolutionTier::Unresolved);
    }

    // ========== Determinism ==========

    #[test]
    fn test_resolve_is_deterministic() {
        let mut fx = Fixture::new();
        fx.glossaries.greek.add_curated("ἀρχῇ", "princípio");
        let engine = fx.engine();
        let token = greek("ἀρχῇ");
        assert_eq!(engine.resolve(&token), engine.resolve(&token));
    }
}
