//! Surface forms that are never translated
//!
//! Divine names and a few sacred proper nouns are rendered in the original
//! script. The registry is consulted before any dictionary and wins even
//! over a conflicting glossary entry.

use super::error::PipelineResult;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Built-in registry used when no `keep_original.json` is present
pub const DEFAULT_KEEP_ORIGINAL: &[&str] = &[
    "Θεός", "Θεοῦ", "Θεόν", "Θεῷ", "θεός", "θεοῦ", "θεόν", "θεῷ",
    "Ἰησοῦς", "Ἰησοῦ", "Ἰησοῦν",
    "Χριστός", "Χριστοῦ", "Χριστόν", "Χριστῷ",
    "יהוה", "אֱלֹהִים", "אֵל",
];

#[derive(Debug, Deserialize)]
struct KeepOriginalFile {
    #[serde(default)]
    all_words: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct KeepOriginalRegistry {
    words: HashSet<String>,
}

impl KeepOriginalRegistry {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_KEEP_ORIGINAL.iter().copied())
    }

    /// Load `{"all_words": [...]}`; a missing file yields the built-in list
    pub fn load(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            debug!("{} not found, using built-in keep-original list", path.display());
            return Ok(Self::with_defaults());
        }
        let content = fs::read_to_string(path)?;
        let file: KeepOriginalFile = serde_json::from_str(&content)?;
        Ok(Self::new(file.all_words))
    }

    /// Exact membership test; no normalization of any kind
    pub fn is_kept(&self, surface_text: &str) -> bool {
        self.words.contains(surface_text)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
