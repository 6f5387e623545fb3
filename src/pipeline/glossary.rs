//! Append-only word → translation dictionary
//!
//! One cache per script, loaded wholesale from a JSON snapshot at run start
//! and written back wholesale by [`GlossaryCache::flush`]. Stored keys are
//! kept exactly as they appear on disk; lookups go through a canonical-key
//! index (see [`normalize`]), so a Hebrew word learned with cantillation
//! marks is found again without them.
//!
//! `flush` overwrites the file; two runs sharing one glossary file will lose
//! each other's learned entries. Serialize runs per glossary file.

use super::data::{GlossaryEntry, GlossaryOrigin, Script};
use super::error::{PipelineError, PipelineResult};
use super::normalize::{normalize, strip_combining_marks};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk value: either a full entry or the legacy bare translation string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Full(GlossaryEntry),
    Plain(String),
}

/// Borrowed form written back by `flush`, preserving legacy plain values
#[derive(Serialize)]
#[serde(untagged)]
enum StoredRef<'a> {
    Full(&'a GlossaryEntry),
    Plain(&'a str),
}

#[derive(Debug, Clone)]
pub struct GlossaryCache {
    script: Script,
    path: Option<PathBuf>,
    /// Stored key → entry, keys as found on disk or as learned
    entries: BTreeMap<String, GlossaryEntry>,
    /// Canonical key → stored key answering lookups for it
    index: HashMap<String, String>,
    /// Stored keys whose value was a bare string on disk
    plain: HashSet<String>,
    dirty: bool,
}

impl GlossaryCache {
    /// Empty cache that is never persisted
    pub fn in_memory(script: Script) -> Self {
        Self {
            script,
            path: None,
            entries: BTreeMap::new(),
            index: HashMap::new(),
            plain: HashSet::new(),
            dirty: false,
        }
    }

    /// Load a snapshot; a missing file starts an empty cache bound to `path`
    pub fn load(path: &Path, script: Script) -> PipelineResult<Self> {
        let mut cache = Self::in_memory(script);
        cache.path = Some(path.to_path_buf());

        if !path.exists() {
            debug!("Glossary {} not found, starting empty", path.display());
            return Ok(cache);
        }

        let content = fs::read_to_string(path)?;
        let stored: BTreeMap<String, StoredEntry> = serde_json::from_str(&content)?;
        for (key, value) in stored {
            let entry = match value {
                StoredEntry::Full(entry) => entry,
                StoredEntry::Plain(translation) => {
                    cache.plain.insert(key.clone());
                    GlossaryEntry {
                        translation,
                        origin: GlossaryOrigin::Curated,
                        created_at: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
                        provider: None,
                    }
                }
            };
            let canonical = normalize(&key, script);
            // First stored key wins lookups when two share a canonical form
            if let Some(existing) = cache.index.get(&canonical) {
                warn!(
                    "Glossary keys '{}' and '{}' share canonical form '{}'; using '{}'",
                    existing, key, canonical, existing
                );
            } else if !canonical.is_empty() {
                cache.index.insert(canonical, key.clone());
            }
            cache.entries.insert(key, entry);
        }

        info!(
            "Loaded {} {} glossary entries from {}",
            cache.entries.len(),
            script,
            path.display()
        );
        Ok(cache)
    }

    pub fn script(&self) -> Script {
        self.script
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a translation, trying the key as given, then lower-case,
    /// upper-case and mark-stripped variants, in that order
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let key = normalize(key, self.script);
        if let Some(entry) = self.by_canonical(&key) {
            return Some(&entry.translation);
        }

        let variants = [
            key.to_lowercase(),
            key.to_uppercase(),
            strip_combining_marks(&key),
        ];
        variants
            .iter()
            .find_map(|variant| self.by_canonical(variant))
            .map(|entry| entry.translation.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&GlossaryEntry> {
        self.by_canonical(&normalize(key, self.script))
    }

    fn by_canonical(&self, canonical: &str) -> Option<&GlossaryEntry> {
        self.index
            .get(canonical)
            .and_then(|stored| self.entries.get(stored))
    }

    /// Insert a learned entry unless the key already exists
    ///
    /// Returns whether an insertion happened.
    pub fn learn(&mut self, key: &str, translation: &str) -> bool {
        self.insert(key, GlossaryEntry::learned(translation, None))
    }

    /// Same as [`learn`](Self::learn), recording which provider produced it
    pub fn learn_from(&mut self, key: &str, translation: &str, provider: &str) -> bool {
        self.insert(key, GlossaryEntry::learned(translation, Some(provider)))
    }

    /// Insert a curated entry unless the key already exists
    pub fn add_curated(&mut self, key: &str, translation: &str) -> bool {
        self.insert(key, GlossaryEntry::curated(translation))
    }

    fn insert(&mut self, key: &str, entry: GlossaryEntry) -> bool {
        let key = normalize(key, self.script);
        if key.is_empty() || self.index.contains_key(&key) || self.entries.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), key.clone());
        self.entries.insert(key, entry);
        self.dirty = true;
        true
    }

    /// Write the whole cache to its snapshot file
    ///
    /// Loaded keys and values are written back as they were read; only the
    /// entries added since are new.
    ///
    /// Returns `Ok(false)` when there was nothing to write (no path, or no
    /// change since the last flush).
    pub fn flush(&mut self) -> PipelineResult<bool> {
        let Some(path) = self.path.as_ref() else {
            return Ok(false);
        };
        if !self.dirty {
            return Ok(false);
        }

        let stored: BTreeMap<&str, StoredRef<'_>> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                let value = if self.plain.contains(key) {
                    StoredRef::Plain(&entry.translation)
                } else {
                    StoredRef::Full(entry)
                };
                (key.as_str(), value)
            })
            .collect();
        let json = serde_json::to_string_pretty(&stored)?;
        let tmp = path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&tmp, json.as_bytes())?;
            fs::rename(&tmp, path)
        };
        write().map_err(|e| {
            PipelineError::PersistenceWrite(format!(
                "Failed to write glossary '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.dirty = false;
        info!("Saved {} glossary entries to {}", self.entries.len(), path.display());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn learned_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.origin == GlossaryOrigin::Learned)
            .count()
    }
}

/// The Greek and Hebrew glossaries of one data directory
#[derive(Debug, Clone)]
pub struct GlossarySet {
    pub greek: GlossaryCache,
    pub hebrew: GlossaryCache,
}

impl GlossarySet {
    pub fn in_memory() -> Self {
        Self {
            greek: GlossaryCache::in_memory(Script::Greek),
            hebrew: GlossaryCache::in_memory(Script::Hebrew),
        }
    }

    /// Load `greek.json` and `hebrew.json` from `dir`
    pub fn load(dir: &Path) -> PipelineResult<Self> {
        Ok(Self {
            greek: GlossaryCache::load(&dir.join("greek.json"), Script::Greek)?,
            hebrew: GlossaryCache::load(&dir.join("hebrew.json"), Script::Hebrew)?,
        })
    }

    pub fn for_script(&self, script: Script) -> &GlossaryCache {
        match script {
            Script::Greek => &self.greek,
            Script::Hebrew => &self.hebrew,
        }
    }

    pub fn for_script_mut(&mut self, script: Script) -> &mut GlossaryCache {
        match script {
            Script::Greek => &mut self.greek,
            Script::Hebrew => &mut self.hebrew,
        }
    }

    /// Flush both caches; returns how many files were written
    pub fn flush_all(&mut self) -> PipelineResult<usize> {
        let mut written = 0;
        for script in Script::ALL {
            if self.for_script_mut(script).flush()? {
                written += 1;
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Lookup ==========

    #[test]
    fn test_lookup_exact() {
        let mut glossary = GlossaryCache::in_memory(Script::Greek);
        glossary.add_curated("λόγος", "palavra");
        assert_eq!(glossary.lookup("λόγος"), Some("palavra"));
        assert_eq!(glossary.lookup("ἀρχῇ"), None);
    }

    #[test]
    fn test_lookup_case_variants() {
        let mut glossary = GlossaryCache::in_memory(Script::Greek);
        glossary.add_curated("ἐν", "em");
        glossary.add_curated("ΚΑΙ", "e");
        assert_eq!(glossary.lookup("Ἐν"), Some("em"));
        assert_eq!(glossary.lookup("καὶ"), None);
        assert_eq!(glossary.lookup("και"), Some("e"));
    }

    #[test]
    fn test_lookup_mark_stripped_variant_only_hits_unaccented_keys() {
        let mut glossary = GlossaryCache::in_memory(Script::Greek);
        glossary.add_curated("λόγος", "palavra");
        // The accented key is never reached from an unaccented token
        assert_eq!(glossary.lookup("λογος"), None);

        glossary.add_curated("ιδου", "eis");
        assert_eq!(glossary.lookup("ἰδού"), Some("eis"));
    }

    #[test]
    fn test_hebrew_lookup_ignores_cantillation() {
        let mut glossary = GlossaryCache::in_memory(Script::Hebrew);
        glossary.learn("הַמֶּ֔לֶךְ", "o-rei");
        assert_eq!(glossary.lookup("הַמֶּלֶךְ"), Some("o-rei"));
        assert_eq!(glossary.lookup("הַמֶּ֖לֶךְ"), Some("o-rei"));
    }

    // ========== Learning ==========

    #[test]
    fn test_learn_never_overwrites() {
        let mut glossary = GlossaryCache::in_memory(Script::Greek);
        assert!(glossary.learn("λόγος", "X"));
        assert!(!glossary.learn("λόγος", "Y"));
        assert_eq!(glossary.lookup("λόγος"), Some("X"));
    }

    #[test]
    fn test_learn_does_not_overwrite_curated() {
        let mut glossary = GlossaryCache::in_memory(Script::Greek);
        glossary.add_curated("λόγος", "palavra");
        assert!(!glossary.learn_from("λόγος", "verbo", "mock"));
        let entry = glossary.get("λόγος").unwrap();
        assert_eq!(entry.translation, "palavra");
        assert_eq!(entry.origin, GlossaryOrigin::Curated);
    }

    #[test]
    fn test_learn_records_origin_and_provider() {
        let mut glossary = GlossaryCache::in_memory(Script::Greek);
        glossary.learn_from("λόγος", "palavra", "openai:gpt-4o");
        let entry = glossary.get("λόγος").unwrap();
        assert_eq!(entry.origin, GlossaryOrigin::Learned);
        assert_eq!(entry.provider.as_deref(), Some("openai:gpt-4o"));
        assert_eq!(glossary.learned_count(), 1);
    }

    #[test]
    fn test_learn_rejects_empty_key() {
        let mut glossary = GlossaryCache::in_memory(Script::Greek);
        assert!(!glossary.learn("", "nada"));
        assert!(glossary.is_empty());
    }

    // ========== Persistence ==========

    #[test]
    fn test_flush_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greek.json");

        let mut glossary = GlossaryCache::load(&path, Script::Greek).unwrap();
        assert!(glossary.is_empty());
        glossary.add_curated("ἀρχῇ", "princípio");
        glossary.learn("λόγος", "palavra");
        assert!(glossary.flush().unwrap());
        // Nothing changed since the last flush
        assert!(!glossary.flush().unwrap());

        let reloaded = GlossaryCache::load(&path, Script::Greek).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.lookup("λόγος"), Some("palavra"));
        assert_eq!(reloaded.get("λόγος").unwrap().origin, GlossaryOrigin::Learned);
    }

    #[test]
    fn test_flush_without_path_is_noop() {
        let mut glossary = GlossaryCache::in_memory(Script::Greek);
        glossary.learn("λόγος", "palavra");
        assert!(!glossary.flush().unwrap());
    }

    #[test]
    fn test_load_legacy_plain_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greek.json");
        fs::write(
            &path,
            r#"{"λόγος": "palavra", "ἀρχῇ": {"translation": "princípio", "source": "openai"}}"#,
        )
        .unwrap();

        let glossary = GlossaryCache::load(&path, Script::Greek).unwrap();
        assert_eq!(glossary.lookup("λόγος"), Some("palavra"));
        assert_eq!(glossary.lookup("ἀρχῇ"), Some("princípio"));
        assert_eq!(glossary.get("λόγος").unwrap().origin, GlossaryOrigin::Curated);
    }

    #[test]
    fn test_load_hebrew_keys_are_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hebrew.json");
        fs::write(&path, r#"{"שָׁנָ֔ה": "ano"}"#).unwrap();

        let glossary = GlossaryCache::load(&path, Script::Hebrew).unwrap();
        assert_eq!(glossary.lookup("שָׁנָה"), Some("ano"));
    }

    #[test]
    fn test_flush_keeps_loaded_keys_and_values_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hebrew.json");
        fs::write(&path, r#"{"שָׁנָ֔ה": "a", "שָׁנָה": "b"}"#).unwrap();

        let mut glossary = GlossaryCache::load(&path, Script::Hebrew).unwrap();
        assert_eq!(glossary.len(), 2);
        assert!(glossary.lookup("שָׁנָה").is_some());
        assert!(glossary.learn("מֶלֶךְ", "rei"));
        assert!(glossary.flush().unwrap());

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["שָׁנָ֔ה"], "a");
        assert_eq!(on_disk["שָׁנָה"], "b");
        assert_eq!(on_disk["מֶלֶךְ"]["translation"], "rei");

        let reloaded = GlossaryCache::load(&path, Script::Hebrew).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.lookup("מֶלֶךְ"), Some("rei"));
    }

    #[test]
    fn test_learn_skips_word_covered_by_a_cantillated_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hebrew.json");
        fs::write(&path, r#"{"שָׁנָ֔ה": "ano"}"#).unwrap();

        let mut glossary = GlossaryCache::load(&path, Script::Hebrew).unwrap();
        assert!(!glossary.learn("שָׁנָה", "outro"));
        assert_eq!(glossary.len(), 1);
        assert!(!glossary.flush().unwrap());
    }

    #[test]
    fn test_glossary_set_routes_by_script() {
        let mut set = GlossarySet::in_memory();
        set.for_script_mut(Script::Greek).learn("λόγος", "palavra");
        assert_eq!(set.for_script(Script::Greek).len(), 1);
        assert!(set.for_script(Script::Hebrew).is_empty());
        assert_eq!(set.flush_all().unwrap(), 0);
    }
}
