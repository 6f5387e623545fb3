//! One resolution run over a scope
//!
//! For each script the run pages through the unresolved tokens, resolves
//! what it can locally, hands the rest to the batch orchestrator and
//! finally flushes the glossaries. Only an invalid scope aborts the run;
//! everything else is counted in the returned [`RunStats`].

use super::config::RunConfig;
use super::data::{RunStats, Script};
use super::engine::ResolutionEngine;
use super::error::PipelineResult;
use super::glossary::GlossarySet;
use super::keep_original::KeepOriginalRegistry;
use super::orchestrator::BatchOrchestrator;
use super::patterns::PatternMatcher;
use super::store::{Scope, TokenStore, UpdateOutcome};
use super::translator::WordTranslator;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Everything the local tiers consult
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub keep_original: KeepOriginalRegistry,
    pub glossaries: GlossarySet,
    pub patterns: PatternMatcher,
}

impl Lexicon {
    /// Built-in keep-original list and patterns, empty unpersisted glossaries
    pub fn in_memory() -> PipelineResult<Self> {
        Ok(Self {
            keep_original: KeepOriginalRegistry::with_defaults(),
            glossaries: GlossarySet::in_memory(),
            patterns: PatternMatcher::with_defaults()?,
        })
    }

    /// Load `glossary/{greek,hebrew,keep_original,patterns}.json` under `data_dir`
    pub fn load(data_dir: &Path) -> PipelineResult<Self> {
        let dir = data_dir.join("glossary");
        Ok(Self {
            keep_original: KeepOriginalRegistry::load(&dir.join("keep_original.json"))?,
            glossaries: GlossarySet::load(&dir)?,
            patterns: PatternMatcher::load(&dir.join("patterns.json"))?,
        })
    }

    pub fn engine(&self) -> ResolutionEngine<'_> {
        ResolutionEngine::new(&self.keep_original, &self.glossaries, &self.patterns)
    }
}

/// Resolve every unresolved token in the configured scope
pub async fn run(
    config: &RunConfig,
    lexicon: &mut Lexicon,
    store: &dyn TokenStore,
    translator: &dyn WordTranslator,
    stop: Arc<AtomicBool>,
) -> PipelineResult<RunStats> {
    let scope = Scope::parse(&config.scope)?;
    scope.validate(store).await?;

    info!(
        "Starting run over {} (batch size {}, provider {})",
        scope,
        config.batch_size,
        translator.provider_name()
    );

    let mut stats = RunStats::default();
    for script in Script::ALL {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let script_stats = run_script(config, &scope, script, lexicon, store, translator, &stop).await;
        info!(
            "{}: {} tokens, {} resolved, {} failed",
            script,
            script_stats.total,
            script_stats.newly_resolved(),
            script_stats.failed
        );
        stats.merge(&script_stats);
    }

    match lexicon.glossaries.flush_all() {
        Ok(written) => info!("Flushed {} glossary files", written),
        Err(e) => error!("Failed to save glossaries: {}", e),
    }

    info!("Run finished: {} of {} tokens resolved", stats.newly_resolved(), stats.total);
    Ok(stats)
}

async fn run_script(
    config: &RunConfig,
    scope: &Scope,
    script: Script,
    lexicon: &mut Lexicon,
    store: &dyn TokenStore,
    translator: &dyn WordTranslator,
    stop: &Arc<AtomicBool>,
) -> RunStats {
    let orchestrator = BatchOrchestrator::new(translator, config.service.retry.clone(), config.batch_size)
        .with_batch_delay(config.batch_delay())
        .with_flush_every(config.flush_every)
        .with_stop_flag(Arc::clone(stop));

    let mut stats = RunStats::default();
    let mut cursor = None;

    loop {
        if stop.load(Ordering::SeqCst) {
            warn!("Stop requested, ending {} pass", script);
            break;
        }

        let page = match store
            .fetch_unresolved(scope, script, cursor, config.page_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                error!("Failed to fetch {} tokens: {}", script, e);
                break;
            }
        };
        let Some(last) = page.last() else {
            break;
        };
        cursor = Some(last.id);
        stats.total += page.len();

        let mut remainder = Vec::new();
        {
            let engine = lexicon.engine();
            for token in page {
                let result = engine.resolve(&token);
                let Some(translation) = result.translation else {
                    remainder.push(token);
                    continue;
                };
                match store.update_translation(token.id, &translation).await {
                    Ok(UpdateOutcome::Applied) => stats.record(result.tier),
                    Ok(UpdateOutcome::AlreadyResolved) => stats.skipped += 1,
                    Ok(UpdateOutcome::Missing) => {
                        warn!("Token {} vanished before it could be written", token.id);
                        stats.failed += 1;
                    }
                    Err(e) => {
                        warn!("Failed to write token {}: {}", token.id, e);
                        stats.failed += 1;
                    }
                }
            }
        }

        if remainder.is_empty() {
            continue;
        }
        let batch = orchestrator
            .resolve_batch(&remainder, script, store, lexicon.glossaries.for_script_mut(script))
            .await;
        stats.resolved_ai += batch.resolved;
        stats.failed += batch.failed;
        stats.skipped += batch.skipped;
        if batch.interrupted {
            break;
        }
    }

    stats
}
