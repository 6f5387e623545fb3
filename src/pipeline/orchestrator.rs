//! Batch translation of the tokens no local tier could resolve
//!
//! Translation is a function of the word, not the occurrence: tokens are
//! deduplicated by surface form, the unique words are sent to the service
//! in bounded groups, and every answer is written back to all tokens that
//! share the word. A group that fails never stops the groups after it.

use super::data::{Script, Token};
use super::glossary::GlossaryCache;
use super::normalize::canonical_key;
use super::retry::RetryPolicy;
use super::store::{TokenStore, UpdateOutcome};
use super::translator::{WordTranslator, sanitize_translation};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counts for one `resolve_batch` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub unique_words: usize,
    pub groups: usize,
    /// Tokens written with a service translation
    pub resolved: usize,
    /// Tokens left unresolved (no answer, or the write failed)
    pub failed: usize,
    /// Tokens that turned out to be resolved already
    pub skipped: usize,
    /// New glossary entries
    pub learned: usize,
    /// Set when the stop flag ended the call before every group was sent
    pub interrupted: bool,
}

pub struct BatchOrchestrator<'a> {
    translator: &'a dyn WordTranslator,
    policy: RetryPolicy,
    batch_size: usize,
    batch_delay: Duration,
    flush_every: usize,
    stop: Option<Arc<AtomicBool>>,
    /// Groups sent over the orchestrator's lifetime, across calls
    groups_sent: AtomicUsize,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(translator: &'a dyn WordTranslator, policy: RetryPolicy, batch_size: usize) -> Self {
        Self {
            translator,
            policy,
            batch_size: batch_size.max(1),
            batch_delay: Duration::ZERO,
            flush_every: 0,
            stop: None,
            groups_sent: AtomicUsize::new(0),
        }
    }

    /// Pause between consecutive groups, to stay under service rate limits
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Flush the glossary after every `n` groups (0 = leave it to the caller)
    ///
    /// Groups are counted across all `resolve_batch` calls on this value, so
    /// a run paging through the store flushes on the same cadence.
    pub fn with_flush_every(mut self, n: usize) -> Self {
        self.flush_every = n;
        self
    }

    /// Stop before the next group once `flag` is set
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Translate and apply the given unresolved tokens of one script
    ///
    /// Tokens of another script are ignored. Words the service did not
    /// answer stay unresolved and are picked up again by the next run.
    pub async fn resolve_batch(
        &self,
        tokens: &[Token],
        script: Script,
        store: &dyn TokenStore,
        glossary: &mut GlossaryCache,
    ) -> BatchStats {
        let mut stats = BatchStats::default();

        // Unique words in first-seen order, each with its token ids
        let mut order: Vec<String> = Vec::new();
        let mut occurrences: HashMap<String, Vec<u64>> = HashMap::new();
        for token in tokens.iter().filter(|t| t.script == script && !t.is_resolved()) {
            let ids = occurrences.entry(token.surface_text.clone()).or_insert_with(|| {
                order.push(token.surface_text.clone());
                Vec::new()
            });
            ids.push(token.id);
        }
        stats.unique_words = order.len();
        if order.is_empty() {
            return stats;
        }

        let total_groups = order.len().div_ceil(self.batch_size);
        info!(
            "Translating {} unique {} words in {} groups via {}",
            order.len(),
            script,
            total_groups,
            self.translator.provider_name()
        );

        for (index, group) in order.chunks(self.batch_size).enumerate() {
            if self.stop_requested() {
                let remaining: usize = order[index * self.batch_size..]
                    .iter()
                    .map(|word| occurrences[word].len())
                    .sum();
                warn!("Stop requested, leaving {} tokens for the next run", remaining);
                stats.failed += remaining;
                stats.interrupted = true;
                break;
            }
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let answers = self.policy.translate(self.translator, group, script).await;
            stats.groups += 1;
            let sent = self.groups_sent.fetch_add(1, Ordering::SeqCst) + 1;

            for word in group {
                let ids = &occurrences[word];
                let Some(translation) = answers.get(word).and_then(|t| sanitize_translation(t)) else {
                    debug!("No translation for '{}'", word);
                    stats.failed += ids.len();
                    continue;
                };

                let key = canonical_key(word, script);
                if glossary.learn_from(&key, &translation, self.translator.provider_name()) {
                    stats.learned += 1;
                }

                for &id in ids {
                    match store.update_translation(id, &translation).await {
                        Ok(UpdateOutcome::Applied) => stats.resolved += 1,
                        Ok(UpdateOutcome::AlreadyResolved) => stats.skipped += 1,
                        Ok(UpdateOutcome::Missing) => {
                            warn!("Token {} vanished before it could be written", id);
                            stats.failed += 1;
                        }
                        Err(e) => {
                            warn!("Failed to write token {}: {}", id, e);
                            stats.failed += 1;
                        }
                    }
                }
            }

            info!(
                "Group {}/{}: {} of {} words answered",
                index + 1,
                total_groups,
                group.iter().filter(|w| answers.contains_key(*w)).count(),
                group.len()
            );

            if self.flush_every > 0 && sent % self.flush_every == 0 {
                if let Err(e) = glossary.flush() {
                    warn!("Periodic glossary flush failed: {}", e);
                }
            }
        }

        stats
    }
}
