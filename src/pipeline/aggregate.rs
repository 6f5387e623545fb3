//! Verse-level text rebuilt from token state
//!
//! Rendering is a pure function of the tokens: sorted by position, resolved
//! tokens contribute their translation and unresolved ones their bracketed
//! surface form. Rebuilding twice with unchanged tokens gives identical text.

use super::data::{Token, VerseAggregate};
use super::error::{PipelineError, PipelineResult};
use super::store::{Scope, TokenStore, VerseStore};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Layer written by a rebuild
pub const DEFAULT_LAYER: &str = "N0";
/// Provenance tag of rebuilt aggregates
pub const REBUILD_SOURCE: &str = "glossary-rebuild";

/// Literal text of one verse
///
/// Tokens are sorted by `position` here, whatever order they arrive in. A
/// resolved token with a blank translation is shown bracketed like an
/// unresolved one.
pub fn render_literal(tokens: &[Token]) -> String {
    let mut ordered: Vec<&Token> = tokens.iter().collect();
    ordered.sort_by_key(|token| (token.position, token.id));

    let words: Vec<String> = ordered
        .iter()
        .map(|token| match token.translation() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => format!("[{}]", token.surface_text),
        })
        .collect();

    words.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub updated: usize,
    /// Verses in scope with no tokens; nothing is written for them
    pub skipped: usize,
    pub errors: usize,
}

pub struct AggregationEngine<'a> {
    tokens: &'a dyn TokenStore,
    verses: &'a dyn VerseStore,
    layer: String,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(tokens: &'a dyn TokenStore, verses: &'a dyn VerseStore) -> Self {
        Self {
            tokens,
            verses,
            layer: DEFAULT_LAYER.to_string(),
        }
    }

    pub fn with_layer(mut self, layer: &str) -> Self {
        self.layer = layer.to_string();
        self
    }

    /// Recompute and upsert the aggregate of one verse
    ///
    /// A verse without tokens is a `Validation` error and writes nothing.
    pub async fn rebuild_verse(&self, verse_id: u64) -> PipelineResult<VerseAggregate> {
        let tokens = self.tokens.verse_tokens(verse_id).await?;
        if tokens.is_empty() {
            return Err(PipelineError::Validation(format!(
                "Verse {} has no tokens",
                verse_id
            )));
        }
        let literal = render_literal(&tokens);

        let aggregate = VerseAggregate {
            verse_id,
            layer: self.layer.clone(),
            readable_text: literal.clone(),
            literal_text: literal,
            source: REBUILD_SOURCE.to_string(),
            updated_at: Utc::now(),
        };
        self.verses.upsert(aggregate.clone()).await?;
        debug!("Rebuilt verse {}: {}", verse_id, aggregate.literal_text);
        Ok(aggregate)
    }

    /// Rebuild every verse in scope; one failing verse does not stop the rest
    pub async fn rebuild_scope(&self, scope: &Scope) -> PipelineResult<RebuildStats> {
        let verse_ids = self.tokens.verses_in_scope(scope).await?;
        info!("Rebuilding {} verses in {} (layer {})", verse_ids.len(), scope, self.layer);

        let mut stats = RebuildStats::default();
        for verse_id in verse_ids {
            match self.rebuild_verse(verse_id).await {
                Ok(_) => stats.updated += 1,
                Err(PipelineError::Validation(e)) => {
                    debug!("Skipping verse {}: {}", verse_id, e);
                    stats.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to rebuild verse {}: {}", verse_id, e);
                    stats.errors += 1;
                }
            }
        }

        info!(
            "Rebuild finished: {} updated, {} skipped, {} errors",
            stats.updated, stats.skipped, stats.errors
        );
        Ok(stats)
    }
}
