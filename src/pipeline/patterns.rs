//! Ordered morphological pattern rules
//!
//! Each rule maps a family of surface forms (a stem plus optional
//! diacritics, prefixes or a trailing maqaf) to one translation. Rules are
//! plain data loaded from `patterns.json` and evaluated first-match-wins in
//! declaration order.
//!
//! ```json
//! [
//!   { "pattern": "בְּנֵ.*י־?", "translation": "filhos-de", "script": "HE" },
//!   { "pattern": "Πέτρου", "translation": "de-Pedro", "target": "raw" }
//! ]
//! ```

use super::data::Script;
use super::error::{PipelineError, PipelineResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Which form of the word a rule is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTarget {
    /// The normalized key (Hebrew without cantillation)
    #[default]
    Canonical,
    /// The surface text exactly as stored
    Raw,
}

/// Rule as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRuleSpec {
    pub pattern: String,
    pub translation: String,
    #[serde(default)]
    pub target: MatchTarget,
    /// Restrict the rule to one script; `None` applies to both
    #[serde(default)]
    pub script: Option<Script>,
}

impl PatternRuleSpec {
    pub fn new(pattern: &str, translation: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            translation: translation.to_string(),
            target: MatchTarget::Canonical,
            script: None,
        }
    }

    pub fn raw(mut self) -> Self {
        self.target = MatchTarget::Raw;
        self
    }

    pub fn for_script(mut self, script: Script) -> Self {
        self.script = Some(script);
        self
    }
}

/// Compiled rule
#[derive(Debug, Clone)]
pub struct PatternRule {
    regex: Regex,
    translation: String,
    target: MatchTarget,
    script: Option<Script>,
}

impl PatternRule {
    /// Compile a rule; the pattern is anchored at both ends
    ///
    /// Patterns containing Hebrew and tested against the canonical key are
    /// NFD-decomposed first so their point order matches normalized words.
    pub fn compile(spec: &PatternRuleSpec) -> PipelineResult<Self> {
        let source = if spec.target == MatchTarget::Canonical && contains_hebrew(&spec.pattern) {
            spec.pattern.nfd().collect::<String>()
        } else {
            spec.pattern.clone()
        };

        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            PipelineError::Config(format!("Invalid pattern '{}': {}", spec.pattern, e))
        })?;

        Ok(Self {
            regex,
            translation: spec.translation.clone(),
            target: spec.target,
            script: spec.script,
        })
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn matches(&self, script: Script, surface_text: &str, canonical_key: &str) -> bool {
        if self.script.is_some_and(|s| s != script) {
            return false;
        }
        match self.target {
            MatchTarget::Canonical => self.regex.is_match(canonical_key),
            MatchTarget::Raw => self.regex.is_match(surface_text),
        }
    }
}

fn contains_hebrew(text: &str) -> bool {
    text.chars().any(|c| ('\u{0590}'..='\u{05FF}').contains(&c))
}

/// Built-in families for very frequent words
pub fn default_rule_specs() -> Vec<PatternRuleSpec> {
    vec![
        PatternRuleSpec::new("הַמֶּלֶךְ", "o-rei").for_script(Script::Hebrew),
        PatternRuleSpec::new("בְּנֵ.*י־?", "filhos-de").for_script(Script::Hebrew),
        PatternRuleSpec::new("בִּירוּשָׁל.*ם", "em-Jerusalém").for_script(Script::Hebrew),
        PatternRuleSpec::new("יְרוּשָׁל.*ם", "Jerusalém").for_script(Script::Hebrew),
        PatternRuleSpec::new("וַ.*יַּחֲנוּ", "e-acamparam").for_script(Script::Hebrew),
        PatternRuleSpec::new("כֹּה", "assim").for_script(Script::Hebrew),
        PatternRuleSpec::new("δο[ῦύ]λο(?:ι|υς)", "servos").for_script(Script::Greek),
        PatternRuleSpec::new("Πέτρου", "de-Pedro").raw(),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    rules: Vec<PatternRule>,
}

impl PatternMatcher {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: &[PatternRuleSpec]) -> PipelineResult<Self> {
        let rules = specs
            .iter()
            .map(PatternRule::compile)
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    pub fn with_defaults() -> PipelineResult<Self> {
        Self::from_specs(&default_rule_specs())
    }

    /// Load a rule table; a missing file yields the built-in rules
    pub fn load(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            debug!("{} not found, using built-in pattern rules", path.display());
            return Self::with_defaults();
        }
        let content = fs::read_to_string(path)?;
        let specs: Vec<PatternRuleSpec> = serde_json::from_str(&content)?;
        Self::from_specs(&specs)
    }

    /// Translation of the first rule matching the word, if any
    pub fn find_match(&self, script: Script, surface_text: &str, canonical_key: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(script, surface_text, canonical_key))
            .map(PatternRule::translation)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
