use crate::config::EtlConfig;
use crate::diff;
use crate::record::MappingEntry;
use crate::scoring::{score_rows, TextItem, ToxicityClassifier};
use crate::source::{flatten_threads, ForumClient, MAX_THREAD_NODES};
use crate::store::{
    known_ids_or_fallback, mapping_or_fallback, observe_insert, FallbackPolicy, RecordStore,
};
use crate::transform::{anonymize, transform, TransformInput};
use crate::util::init_tracing_once;
use ahash::AHashSet;
use anyhow::Result;
use std::time::Instant;

/// One incremental ETL pass, configured once and run against pluggable
/// collaborators (harvest client, store, classifier).
#[derive(Clone, Default)]
pub struct ForumETL {
    cfg: EtlConfig,
}

/// Row counts of one run, for callers and logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub harvested: usize,
    pub transformed: usize,
    pub new_rows: usize,
    pub new_authors: usize,
    pub scored: usize,
}

impl ForumETL {
    pub fn new() -> Self {
        Self { cfg: EtlConfig::default() }
    }

    pub fn with_config(cfg: EtlConfig) -> Self {
        Self { cfg }
    }

    // -------- Builder methods --------
    pub fn target_community(mut self, community: impl Into<String>) -> Self {
        self.cfg = self.cfg.with_target_community(community);
        self
    }
    pub fn harvest_limit(mut self, limit: usize) -> Self {
        self.cfg = self.cfg.with_harvest_limit(limit);
        self
    }
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.cfg = self.cfg.with_chunk_size(size);
        self
    }
    pub fn progress(mut self, yes: bool) -> Self {
        self.cfg = self.cfg.with_progress(yes);
        self
    }
    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.cfg = self.cfg.with_fallback(policy);
        self
    }

    pub fn config(&self) -> &EtlConfig {
        &self.cfg
    }

    /// Full pass: harvest from the client, then process the batch.
    pub fn run(
        &self,
        client: &dyn ForumClient,
        store: &mut dyn RecordStore,
        classifier: Option<&dyn ToxicityClassifier>,
    ) -> Result<RunSummary> {
        self.timed_run(|| {
            let t = Instant::now();
            tracing::info!(
                community = %self.cfg.target_community,
                limit = self.cfg.harvest_limit,
                "harvesting data"
            );
            let threads = client.harvest(&self.cfg.target_community, self.cfg.harvest_limit)?;
            let records = flatten_threads(threads, MAX_THREAD_NODES);
            tracing::info!(
                "harvested {} records ({:.2}s)",
                records.len(),
                t.elapsed().as_secs_f64()
            );

            let harvested = records.len();
            let mut summary = self.process(records.into(), store, classifier)?;
            summary.harvested = harvested;
            Ok(summary)
        })
    }

    /// Process an already-collected batch: pre-loaded records or a batch
    /// file path.
    pub fn run_batch(
        &self,
        input: impl Into<TransformInput>,
        store: &mut dyn RecordStore,
        classifier: Option<&dyn ToxicityClassifier>,
    ) -> Result<RunSummary> {
        let input = input.into();
        self.timed_run(|| self.process(input, store, classifier))
    }

    /// Score rows already persisted in the posts table but missing from the
    /// toxicity table, up to `backfill_limit` per pass. Returns the number
    /// of rows scored.
    pub fn run_backfill(
        &self,
        store: &mut dyn RecordStore,
        classifier: &dyn ToxicityClassifier,
    ) -> Result<usize> {
        init_tracing_once(&self.cfg.log_level);
        let cfg = &self.cfg;
        let t = Instant::now();

        let known_posts = known_ids_or_fallback(store, &cfg.posts_table, cfg.fallback)?;
        let known_scored = known_ids_or_fallback(store, &cfg.toxicity_table, cfg.fallback)?;
        let mut pending: Vec<String> = known_posts.difference(&known_scored).cloned().collect();
        if pending.is_empty() {
            tracing::info!("no rows pending toxicity backfill");
            return Ok(0);
        }
        // Deterministic slice under the per-pass cap.
        pending.sort();
        if pending.len() > cfg.backfill_limit {
            tracing::info!(
                pending = pending.len(),
                cap = cfg.backfill_limit,
                "backfill capped for this pass"
            );
            pending.truncate(cfg.backfill_limit);
        }

        let wanted: AHashSet<String> = pending.into_iter().collect();
        let items = store.fetch_bodies(&wanted, &cfg.posts_table)?;
        tracing::info!("scoring {} backfill rows", items.len());

        let mut results = score_rows(classifier, &items, cfg.chunk_size, cfg.progress)?;
        for row in results.iter_mut() {
            row.body = None;
        }
        observe_insert(store.insert_scores(&results, &cfg.toxicity_table), &cfg.toxicity_table);

        tracing::info!("backfill done: {} rows ({:.2}s)", results.len(), t.elapsed().as_secs_f64());
        Ok(results.len())
    }

    /// Wrap a run with the start/end markers and the total-duration log,
    /// emitted on success and failure alike. No retries.
    fn timed_run(&self, f: impl FnOnce() -> Result<RunSummary>) -> Result<RunSummary> {
        init_tracing_once(&self.cfg.log_level);
        tracing::info!("=== start of etl run ===");
        let started = Instant::now();

        let result = f();
        match &result {
            Ok(summary) => tracing::info!(?summary, "run succeeded"),
            Err(e) => tracing::error!("an error occurred: {e:#}"),
        }
        tracing::info!("=== end of etl run ({:.2}s) ===", started.elapsed().as_secs_f64());
        result
    }

    fn process(
        &self,
        input: TransformInput,
        store: &mut dyn RecordStore,
        classifier: Option<&dyn ToxicityClassifier>,
    ) -> Result<RunSummary> {
        let cfg = &self.cfg;
        let mut summary = RunSummary::default();

        // Transform
        let t = Instant::now();
        let rows = transform(input)?;
        summary.transformed = rows.len();
        tracing::info!("transformed {} rows ({:.2}s)", rows.len(), t.elapsed().as_secs_f64());

        // Diff against known ids
        let t = Instant::now();
        let known = known_ids_or_fallback(store, &cfg.posts_table, cfg.fallback)?;
        tracing::info!(known_ids = known.len(), "filtering new rows");
        let new_rows = diff::filter_new(rows, &known);
        if new_rows.is_empty() {
            tracing::info!("no new rows to process ({:.2}s)", t.elapsed().as_secs_f64());
            return Ok(summary);
        }
        summary.new_rows = new_rows.len();
        tracing::info!("found {} new rows ({:.2}s)", new_rows.len(), t.elapsed().as_secs_f64());

        // Anonymize against the accumulated mapping
        let existing: Vec<MappingEntry> =
            mapping_or_fallback(store, &cfg.authors_table, cfg.fallback)?;
        let (mut new_rows, delta) = anonymize(new_rows, &existing)?;
        summary.new_authors = delta.len();
        tracing::info!(
            total_mappings = existing.len() + delta.len(),
            "username anonymization complete"
        );

        // Persist new authors, then the rows themselves (sans the real handle)
        observe_insert(store.insert_mappings(&delta, &cfg.authors_table), &cfg.authors_table);
        for row in new_rows.iter_mut() {
            row.original_author = None;
        }
        observe_insert(store.insert_posts(&new_rows, &cfg.posts_table), &cfg.posts_table);

        // Toxicity scoring
        match classifier {
            None => tracing::info!("no classifier configured; skipping toxicity analysis"),
            Some(classifier) => {
                let t = Instant::now();
                let items: Vec<TextItem> = new_rows.iter().map(TextItem::from).collect();
                tracing::info!("analyzing {} new rows for toxicity", items.len());
                let mut results = score_rows(classifier, &items, cfg.chunk_size, cfg.progress)?;
                for row in results.iter_mut() {
                    row.body = None;
                }
                observe_insert(
                    store.insert_scores(&results, &cfg.toxicity_table),
                    &cfg.toxicity_table,
                );
                summary.scored = results.len();
                tracing::info!(
                    "toxicity analysis complete: {} rows ({:.2}s)",
                    results.len(),
                    t.elapsed().as_secs_f64()
                );
            }
        }

        Ok(summary)
    }
}
