//! Frequency report of the words still unresolved in a scope

use super::data::Script;
use super::error::PipelineResult;
use super::glossary::GlossarySet;
use super::keep_original::KeepOriginalRegistry;
use super::normalize::{canonical_key, clean_punctuation};
use super::store::{Scope, TokenStore};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

const PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordFrequency {
    pub word: String,
    pub script: Script,
    pub count: usize,
}

/// Unresolved words split by what would happen to them on the next run
#[derive(Debug, Clone, Default, Serialize)]
pub struct UntranslatedReport {
    /// In the keep-original registry
    pub kept: Vec<WordFrequency>,
    /// Already in a glossary, so the next run resolves them locally
    pub in_glossary: Vec<WordFrequency>,
    /// Needs the translation service
    pub untranslated: Vec<WordFrequency>,
}

impl UntranslatedReport {
    pub fn total_occurrences(&self) -> usize {
        [&self.kept, &self.in_glossary, &self.untranslated]
            .iter()
            .flat_map(|bucket| bucket.iter())
            .map(|w| w.count)
            .sum()
    }
}

pub async fn untranslated_report(
    store: &dyn TokenStore,
    scope: &Scope,
    keep_original: &KeepOriginalRegistry,
    glossaries: &GlossarySet,
) -> PipelineResult<UntranslatedReport> {
    let mut counts: HashMap<(Script, String), usize> = HashMap::new();

    for script in Script::ALL {
        let mut cursor = None;
        loop {
            let page = store.fetch_unresolved(scope, script, cursor, PAGE_SIZE).await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.id);
            for token in &page {
                let word = clean_punctuation(&token.surface_text);
                if !word.is_empty() {
                    *counts.entry((script, word)).or_insert(0) += 1;
                }
            }
        }
    }

    let mut report = UntranslatedReport::default();
    for ((script, word), count) in counts {
        let bucket = if keep_original.is_kept(&word) {
            &mut report.kept
        } else if glossaries
            .for_script(script)
            .lookup(&canonical_key(&word, script))
            .is_some()
        {
            &mut report.in_glossary
        } else {
            &mut report.untranslated
        };
        bucket.push(WordFrequency { word, script, count });
    }

    for bucket in [&mut report.kept, &mut report.in_glossary, &mut report.untranslated] {
        bucket.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    }
    Ok(report)
}

fn write_bucket(f: &mut fmt::Formatter<'_>, title: &str, bucket: &[WordFrequency]) -> fmt::Result {
    writeln!(f, "{} ({} words)", title, bucket.len())?;
    for entry in bucket {
        writeln!(f, "  {:>6}  {:<4} {}", entry.count, entry.script, entry.word)?;
    }
    Ok(())
}

impl fmt::Display for UntranslatedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bucket(f, "Kept original", &self.kept)?;
        write_bucket(f, "In glossary", &self.in_glossary)?;
        write_bucket(f, "Untranslated", &self.untranslated)?;
        write!(f, "Total unresolved occurrences: {}", self.total_occurrences())
    }
}
