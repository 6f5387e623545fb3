//! Token and verse-aggregate storage
//!
//! The pipeline only talks to storage through [`TokenStore`] and
//! [`VerseStore`]. [`MemoryStore`] implements both over an in-memory corpus
//! that can be loaded from and saved to a JSON snapshot.

use super::data::{Book, Script, Token, Verse, VerseAggregate};
use super::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Which part of the corpus a run covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Scope {
    #[default]
    All,
    Book(String),
}

impl Scope {
    /// Parse `ALL` or a three-character book code such as `GEN` or `1CO`
    ///
    /// Only the shape is checked here; whether the book exists is checked
    /// against the store by [`Scope::validate`].
    pub fn parse(input: &str) -> PipelineResult<Self> {
        let code = input.trim().to_ascii_uppercase();
        if code == "ALL" {
            return Ok(Scope::All);
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PipelineError::Validation(format!(
                "Invalid book code '{}' (expected ALL or three letters/digits, e.g. GEN, 1CO)",
                input.trim()
            )));
        }
        Ok(Scope::Book(code))
    }

    pub fn book_code(&self) -> Option<&str> {
        match self {
            Scope::All => None,
            Scope::Book(code) => Some(code),
        }
    }

    pub fn includes(&self, book_code: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Book(code) => code == book_code,
        }
    }

    /// Fail with `Validation` unless the scope names a book the store knows
    pub async fn validate(&self, store: &dyn TokenStore) -> PipelineResult<()> {
        let Some(code) = self.book_code() else {
            return Ok(());
        };
        let books = store.books().await?;
        if books.iter().any(|book| book.code == code) {
            Ok(())
        } else {
            Err(PipelineError::Validation(format!("Unknown book code '{}'", code)))
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("ALL"),
            Scope::Book(code) => f.write_str(code),
        }
    }
}

/// Result of a single token write
///
/// The store checks the token before writing, so "nothing changed because
/// the token was already resolved" is told apart from "no such token".
/// A failed write is an `Err(PersistenceWrite)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    AlreadyResolved,
    Missing,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn books(&self) -> PipelineResult<Vec<Book>>;

    /// Next page of unresolved tokens of one script, in ascending id order,
    /// starting strictly after `after_id`
    async fn fetch_unresolved(
        &self,
        scope: &Scope,
        script: Script,
        after_id: Option<u64>,
        page_size: usize,
    ) -> PipelineResult<Vec<Token>>;

    /// Verse ids in scope, ascending
    async fn verses_in_scope(&self, scope: &Scope) -> PipelineResult<Vec<u64>>;

    /// All tokens of a verse, in no particular order
    async fn verse_tokens(&self, verse_id: u64) -> PipelineResult<Vec<Token>>;

    /// Move one token to `Resolved`
    async fn update_translation(&self, token_id: u64, text: &str) -> PipelineResult<UpdateOutcome>;
}

#[async_trait]
pub trait VerseStore: Send + Sync {
    /// Insert or replace the aggregate keyed by `(verse_id, layer)`
    async fn upsert(&self, aggregate: VerseAggregate) -> PipelineResult<()>;

    async fn get(&self, verse_id: u64, layer: &str) -> PipelineResult<Option<VerseAggregate>>;
}

/// Serialized corpus snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub verses: Vec<Verse>,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub aggregates: Vec<VerseAggregate>,
}

#[derive(Debug, Default)]
struct Inner {
    corpus: Corpus,
    /// token id → index into `corpus.tokens`
    token_index: HashMap<u64, usize>,
    /// verse id → book code
    verse_books: HashMap<u64, String>,
}

impl Inner {
    fn new(corpus: Corpus) -> Self {
        let token_index = corpus
            .tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token.id, i))
            .collect();
        let verse_books = corpus
            .verses
            .iter()
            .map(|verse| (verse.id, verse.book_code.clone()))
            .collect();
        Self {
            corpus,
            token_index,
            verse_books,
        }
    }

    fn in_scope(&self, scope: &Scope, verse_id: u64) -> bool {
        match scope {
            Scope::All => true,
            Scope::Book(_) => self
                .verse_books
                .get(&verse_id)
                .is_some_and(|code| scope.includes(code)),
        }
    }
}

/// In-memory corpus implementing both store traits
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            inner: RwLock::new(Inner::new(corpus)),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn load_json(path: &Path) -> PipelineResult<Self> {
        let content = fs::read_to_string(path)?;
        let corpus: Corpus = serde_json::from_str(&content)?;
        info!(
            "Loaded corpus {}: {} books, {} verses, {} tokens",
            path.display(),
            corpus.books.len(),
            corpus.verses.len(),
            corpus.tokens.len()
        );
        Ok(Self::new(corpus))
    }

    /// Write the current corpus back as a JSON snapshot
    pub fn save_json(&self, path: &Path) -> PipelineResult<()> {
        let json = {
            let inner = self.read()?;
            serde_json::to_string_pretty(&inner.corpus)?
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|e| {
                PipelineError::PersistenceWrite(format!(
                    "Failed to write corpus '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        info!("Saved corpus to {}", path.display());
        Ok(())
    }

    /// Copy of the current corpus
    pub fn snapshot(&self) -> PipelineResult<Corpus> {
        Ok(self.read()?.corpus.clone())
    }

    pub fn token(&self, token_id: u64) -> PipelineResult<Option<Token>> {
        let inner = self.read()?;
        Ok(inner
            .token_index
            .get(&token_id)
            .map(|&i| inner.corpus.tokens[i].clone()))
    }

    /// Make every subsequent token write fail, to simulate a broken database
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> PipelineResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| PipelineError::PersistenceWrite("corpus lock poisoned".to_string()))
    }

    fn write(&self) -> PipelineResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| PipelineError::PersistenceWrite("corpus lock poisoned".to_string()))
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn books(&self) -> PipelineResult<Vec<Book>> {
        Ok(self.read()?.corpus.books.clone())
    }

    async fn fetch_unresolved(
        &self,
        scope: &Scope,
        script: Script,
        after_id: Option<u64>,
        page_size: usize,
    ) -> PipelineResult<Vec<Token>> {
        let inner = self.read()?;
        let mut page: Vec<Token> = inner
            .corpus
            .tokens
            .iter()
            .filter(|token| token.script == script && !token.is_resolved())
            .filter(|token| after_id.is_none_or(|after| token.id > after))
            .filter(|token| inner.in_scope(scope, token.verse_id))
            .cloned()
            .collect();
        page.sort_by_key(|token| token.id);
        page.truncate(page_size.max(1));
        debug!("Fetched {} unresolved {} tokens after {:?}", page.len(), script, after_id);
        Ok(page)
    }

    async fn verses_in_scope(&self, scope: &Scope) -> PipelineResult<Vec<u64>> {
        let inner = self.read()?;
        let mut ids: Vec<u64> = inner
            .corpus
            .verses
            .iter()
            .filter(|verse| scope.includes(&verse.book_code))
            .map(|verse| verse.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn verse_tokens(&self, verse_id: u64) -> PipelineResult<Vec<Token>> {
        let inner = self.read()?;
        Ok(inner
            .corpus
            .tokens
            .iter()
            .filter(|token| token.verse_id == verse_id)
            .cloned()
            .collect())
    }

    async fn update_translation(&self, token_id: u64, text: &str) -> PipelineResult<UpdateOutcome> {
        let mut inner = self.write()?;
        let Some(&index) = inner.token_index.get(&token_id) else {
            return Ok(UpdateOutcome::Missing);
        };
        if inner.corpus.tokens[index].is_resolved() {
            return Ok(UpdateOutcome::AlreadyResolved);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PipelineError::PersistenceWrite(format!(
                "write rejected for token {}",
                token_id
            )));
        }
        inner.corpus.tokens[index].resolve(text);
        Ok(UpdateOutcome::Applied)
    }
}

#[async_trait]
impl VerseStore for MemoryStore {
    async fn upsert(&self, aggregate: VerseAggregate) -> PipelineResult<()> {
        let mut inner = self.write()?;
        let aggregates = &mut inner.corpus.aggregates;
        match aggregates
            .iter_mut()
            .find(|a| a.verse_id == aggregate.verse_id && a.layer == aggregate.layer)
        {
            Some(existing) => *existing = aggregate,
            None => aggregates.push(aggregate),
        }
        Ok(())
    }

    async fn get(&self, verse_id: u64, layer: &str) -> PipelineResult<Option<VerseAggregate>> {
        let inner = self.read()?;
        Ok(inner
            .corpus
            .aggregates
            .iter()
            .find(|a| a.verse_id == verse_id && a.layer == layer)
            .cloned())
    }
}
