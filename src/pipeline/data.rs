//! Core data structures for word-level translation
//!
//! A corpus is a list of books, verses and tokens. Each token is one
//! source-language word occurrence; its translation state only ever moves
//! from `Unresolved` to `Resolved`.

use super::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Writing system of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Script {
    #[serde(rename = "GRC", alias = "GREEK")]
    Greek,
    #[serde(rename = "HE", alias = "HEBREW")]
    Hebrew,
}

impl Script {
    pub const ALL: [Script; 2] = [Script::Greek, Script::Hebrew];

    /// Short code used by the corpus tables ("GRC" / "HE")
    pub fn code(&self) -> &'static str {
        match self {
            Script::Greek => "GRC",
            Script::Hebrew => "HE",
        }
    }

    /// Language name used in translation prompts
    pub fn language_name(&self) -> &'static str {
        match self {
            Script::Greek => "grego koiné",
            Script::Hebrew => "hebraico bíblico",
        }
    }

    /// Classify a surface form by its characters
    ///
    /// Any character in the Hebrew block makes the word Hebrew; everything
    /// else is treated as Greek.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(|c| ('\u{0590}'..='\u{05FF}').contains(&c)) {
            Script::Hebrew
        } else {
            Script::Greek
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Script {
    type Err = PipelineError;

    fn from_str(s: &str) -> PipelineResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GRC" | "GREEK" => Ok(Script::Greek),
            "HE" | "HEBREW" => Ok(Script::Hebrew),
            other => Err(PipelineError::Validation(format!(
                "Unknown script '{}' (expected GRC or HE)",
                other
            ))),
        }
    }
}

/// Translation state of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum TranslationState {
    /// Not yet translated; carries the surface text
    Unresolved(String),
    /// Translated text
    Resolved(String),
}

/// One source-language word occurrence at a verse position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TokenRecord")]
pub struct Token {
    pub id: u64,
    pub verse_id: u64,
    /// In-verse order, unique per verse
    pub position: u32,
    pub script: Script,
    /// Original Unicode form, possibly with diacritics or cantillation
    pub surface_text: String,
    pub state: TranslationState,
}

/// Token as read from a snapshot; older corpora carry no script column
#[derive(Deserialize)]
struct TokenRecord {
    id: u64,
    verse_id: u64,
    position: u32,
    #[serde(default)]
    script: Option<Script>,
    surface_text: String,
    #[serde(default)]
    state: Option<TranslationState>,
}

impl From<TokenRecord> for Token {
    fn from(record: TokenRecord) -> Self {
        let script = record
            .script
            .unwrap_or_else(|| Script::detect(&record.surface_text));
        let state = record
            .state
            .unwrap_or_else(|| TranslationState::Unresolved(record.surface_text.clone()));
        Self {
            id: record.id,
            verse_id: record.verse_id,
            position: record.position,
            script,
            surface_text: record.surface_text,
            state,
        }
    }
}

impl Token {
    /// Create a token as ingestion does: unresolved, carrying its surface text
    pub fn unresolved(
        id: u64,
        verse_id: u64,
        position: u32,
        script: Script,
        surface_text: &str,
    ) -> Self {
        Self {
            id,
            verse_id,
            position,
            script,
            surface_text: surface_text.to_string(),
            state: TranslationState::Unresolved(surface_text.to_string()),
        }
    }

    /// Create an already translated token
    pub fn resolved(
        id: u64,
        verse_id: u64,
        position: u32,
        script: Script,
        surface_text: &str,
        translation: &str,
    ) -> Self {
        Self {
            id,
            verse_id,
            position,
            script,
            surface_text: surface_text.to_string(),
            state: TranslationState::Resolved(translation.to_string()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, TranslationState::Resolved(_))
    }

    /// Current translation, if any
    pub fn translation(&self) -> Option<&str> {
        match &self.state {
            TranslationState::Resolved(text) => Some(text),
            TranslationState::Unresolved(_) => None,
        }
    }

    /// Move the token to `Resolved`
    ///
    /// Returns `false` without touching the token when it is already resolved.
    pub fn resolve(&mut self, translation: &str) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.state = TranslationState::Resolved(translation.to_string());
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Three-character canonical code, e.g. "GEN", "REV", "1CO"
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub id: u64,
    pub book_code: String,
    pub chapter: u32,
    pub number: u32,
}

/// Where a glossary entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum GlossaryOrigin {
    #[default]
    Curated,
    Learned,
}

/// Canonical word → translation mapping; the key lives in the glossary map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub translation: String,
    #[serde(default)]
    pub origin: GlossaryOrigin,
    #[serde(default = "epoch", alias = "added")]
    pub created_at: DateTime<Utc>,
    /// Translation service that produced a learned entry, e.g. "openai:gpt-4o"
    #[serde(default, alias = "source", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl GlossaryEntry {
    pub fn curated(translation: &str) -> Self {
        Self {
            translation: translation.to_string(),
            origin: GlossaryOrigin::Curated,
            created_at: Utc::now(),
            provider: None,
        }
    }

    pub fn learned(translation: &str, provider: Option<&str>) -> Self {
        Self {
            translation: translation.to_string(),
            origin: GlossaryOrigin::Learned,
            created_at: Utc::now(),
            provider: provider.map(str::to_string),
        }
    }
}

/// Strategy level that produced a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionTier {
    KeepOriginal,
    Glossary,
    Pattern,
    /// None of the local tiers matched; route to the batch orchestrator
    Unresolved,
}

/// Outcome of resolving one token locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// `None` exactly when `tier` is `Unresolved`
    pub translation: Option<String>,
    pub tier: ResolutionTier,
}

impl ResolutionResult {
    pub fn resolved(translation: &str, tier: ResolutionTier) -> Self {
        Self {
            translation: Some(translation.to_string()),
            tier,
        }
    }

    pub fn unresolved() -> Self {
        Self {
            translation: None,
            tier: ResolutionTier::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.translation.is_some()
    }
}

/// Verse-level text rebuilt from token state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseAggregate {
    pub verse_id: u64,
    /// Representation variant, e.g. "N0"
    pub layer: String,
    pub literal_text: String,
    pub readable_text: String,
    /// Provenance tag, e.g. "glossary-rebuild"
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub resolved_keep_original: usize,
    pub resolved_glossary: usize,
    pub resolved_pattern: usize,
    pub resolved_ai: usize,
    pub failed: usize,
    /// Tokens found already resolved at write time (no write performed)
    pub skipped: usize,
}

impl RunStats {
    /// Count one successful local resolution
    pub fn record(&mut self, tier: ResolutionTier) {
        match tier {
            ResolutionTier::KeepOriginal => self.resolved_keep_original += 1,
            ResolutionTier::Glossary => self.resolved_glossary += 1,
            ResolutionTier::Pattern => self.resolved_pattern += 1,
            ResolutionTier::Unresolved => self.failed += 1,
        }
    }

    pub fn newly_resolved(&self) -> usize {
        self.resolved_keep_original + self.resolved_glossary + self.resolved_pattern + self.resolved_ai
    }

    pub fn merge(&mut self, other: &RunStats) {
        self.total += other.total;
        self.resolved_keep_original += other.resolved_keep_original;
        self.resolved_glossary += other.resolved_glossary;
        self.resolved_pattern += other.resolved_pattern;
        self.resolved_ai += other.resolved_ai;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "  Total processed:   {}", self.total)?;
        writeln!(f, "  Kept original:     {}", self.resolved_keep_original)?;
        writeln!(f, "  From glossary:     {}", self.resolved_glossary)?;
        writeln!(f, "  From patterns:     {}", self.resolved_pattern)?;
        writeln!(f, "  From AI service:   {}", self.resolved_ai)?;
        writeln!(f, "  Already resolved:  {}", self.skipped)?;
        writeln!(f, "  Failed:            {}", self.failed)?;
        write!(f, "{}", "=".repeat(50))
    }
}
