//! The transform pipeline: a pure, total function from one raw batch to
//! persisted-ready rows, plus the separate anonymization stage.
//!
//! Stage order is fixed and externally visible:
//! 1. drop rows with a removed author
//! 2. rename (`id` → `post_id`, `parent_id` → `target_post_id`,
//!    `permalink` → `id_url`)
//! 3. derive `community`
//! 4. split `created_utc` into `date`/`time`, sort most-recent-first, drop
//!    the raw timestamp
//! 5. derive `target_author`
//! 6. derive `number_of_replies`
//! 7. project to the fixed output column order
//!
//! `anonymize` runs strictly after step 7; it depends on the final `author`
//! and `target_author` columns.

use crate::date::split_epoch_seconds;
use crate::enrich;
use crate::ndjson::NdjsonReader;
use crate::pseudonym;
use crate::record::{EnrichedRow, MappingEntry, RawRecord, RecordKind};
use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Input to [`transform`]: either a pre-loaded batch or a location reference
/// resolvable to one (an NDJSON file, optionally `.zst`-compressed). Anything
/// else fails fast before any row is touched.
pub enum TransformInput {
    Records(Vec<RawRecord>),
    Path(PathBuf),
}

impl From<Vec<RawRecord>> for TransformInput {
    fn from(records: Vec<RawRecord>) -> Self {
        Self::Records(records)
    }
}

impl From<PathBuf> for TransformInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&std::path::Path> for TransformInput {
    fn from(path: &std::path::Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Working row between rename and projection. Keeps `created_utc` for the
/// sort and `id_url` for community derivation; both are dropped at
/// projection.
#[derive(Clone, Debug)]
pub(crate) struct StagedRow {
    pub kind: RecordKind,
    pub submission_id: String,
    pub post_id: String,
    pub target_post_id: Option<String>,
    pub author: String,
    pub target_author: Option<String>,
    pub id_url: Option<String>,
    pub community: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub score: i64,
    pub number_of_replies: u64,
    pub created_utc: i64,
    pub date: String,
    pub time: String,
}

/// Run the full transform over one batch. Pure in the batch; the only I/O is
/// resolving a `TransformInput::Path`.
pub fn transform(input: impl Into<TransformInput>) -> Result<Vec<EnrichedRow>> {
    let records = match input.into() {
        TransformInput::Records(records) => {
            tracing::info!(records = records.len(), "transform input is a pre-loaded batch");
            records
        }
        TransformInput::Path(path) => {
            tracing::info!(path = %path.display(), "transform input is a batch file");
            load_batch(&path)?
        }
    };

    let records = clean_raw(records);
    let mut rows = stage_rows(records);
    enrich::derive_community(&mut rows);
    split_timestamps_and_sort(&mut rows)?;
    enrich::derive_target_authors(&mut rows);
    enrich::derive_reply_counts(&mut rows);
    Ok(project(rows))
}

/// Read one raw batch from an NDJSON file. Any unparseable line fails the
/// whole batch: a half-read batch would produce wrong reply counts.
fn load_batch(path: &std::path::Path) -> Result<Vec<RawRecord>> {
    let mut rdr = NdjsonReader::open(path, 256 * 1024)
        .with_context(|| format!("batch location not resolvable: {}", path.display()))?;
    let mut records = Vec::new();
    let mut buf = String::with_capacity(16 * 1024);
    let mut line_no = 0usize;
    loop {
        let n = rdr.read_line(&mut buf)?;
        if n == 0 {
            break;
        }
        line_no += 1;
        if buf.is_empty() {
            continue;
        }
        let record: RawRecord = serde_json::from_str(&buf)
            .with_context(|| format!("{}:{line_no}: malformed raw record", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

/// Stage 1: removed/deleted accounts are excluded from the relational
/// dataset entirely; they neither count toward replies nor carry community
/// context past this point.
fn clean_raw(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let before = records.len();
    let kept: Vec<RawRecord> = records.into_iter().filter(|r| r.author.is_some()).collect();
    let dropped = before - kept.len();
    if dropped > 0 {
        tracing::info!(dropped, "dropped rows with removed authors");
    }
    kept
}

/// Stage 2: rename into the output vocabulary.
fn stage_rows(records: Vec<RawRecord>) -> Vec<StagedRow> {
    records
        .into_iter()
        .map(|r| StagedRow {
            kind: r.kind,
            submission_id: r.submission_id,
            post_id: r.id,
            target_post_id: r.parent_id,
            author: r.author.unwrap_or_default(),
            target_author: None,
            id_url: r.permalink,
            community: None,
            title: r.title,
            body: r.body,
            score: r.score,
            number_of_replies: 0,
            created_utc: r.created_utc,
            date: String::new(),
            time: String::new(),
        })
        .collect()
}

/// Stage 4: calendar date and time-of-day columns, then sort by the raw
/// timestamp descending. Most-recent-first is a user-facing ordering
/// guarantee, not an optimization. The stable sort keeps input order for
/// equal timestamps.
fn split_timestamps_and_sort(rows: &mut Vec<StagedRow>) -> Result<()> {
    for row in rows.iter_mut() {
        let (date, time) = split_epoch_seconds(row.created_utc)?;
        row.date = date;
        row.time = time;
    }
    rows.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
    Ok(())
}

/// Stage 7: project to the documented output schema, dropping `created_utc`
/// and `id_url`.
fn project(rows: Vec<StagedRow>) -> Vec<EnrichedRow> {
    rows.into_iter()
        .map(|r| EnrichedRow {
            kind: r.kind,
            submission_id: r.submission_id,
            post_id: r.post_id,
            target_post_id: r.target_post_id,
            author: r.author,
            target_author: r.target_author,
            community: r.community,
            title: r.title,
            body: r.body,
            score: r.score,
            number_of_replies: r.number_of_replies,
            date: r.date,
            time: r.time,
            original_author: None,
        })
        .collect()
}

/// Substitute author handles with pseudonyms, preserving the real handle in
/// `original_author` for traceability.
///
/// New authors are allocated against `existing_mapping` via the cursor rules
/// in [`crate::pseudonym`]; the returned delta rows are exactly the mapping
/// entries issued by this call. A `target_author` that resolves to no
/// mapping entry (parent outside the batch) stays `None`.
///
/// Validation runs before any row is mutated: an empty author handle here
/// means the batch skipped the transform and is rejected.
pub fn anonymize(
    mut rows: Vec<EnrichedRow>,
    existing_mapping: &[MappingEntry],
) -> Result<(Vec<EnrichedRow>, Vec<MappingEntry>)> {
    if let Some(bad) = rows.iter().find(|r| r.author.is_empty()) {
        bail!("row {} has an empty author handle; was the batch transformed?", bad.post_id);
    }

    let current_authors: BTreeSet<&str> = rows.iter().map(|r| r.author.as_str()).collect();
    let (delta, _cursor) = pseudonym::allocate(existing_mapping, current_authors)?;
    tracing::info!(new_authors = delta.len(), "allocated pseudonyms for new authors");

    let mapping: AHashMap<&str, &str> = existing_mapping
        .iter()
        .chain(delta.iter())
        .map(|e| (e.original_author.as_str(), e.pseudonym.as_str()))
        .collect();

    for row in rows.iter_mut() {
        let pseudonym = mapping
            .get(row.author.as_str())
            .map(|p| p.to_string())
            .with_context(|| format!("no pseudonym allocated for author of {}", row.post_id))?;
        row.original_author = Some(std::mem::replace(&mut row.author, pseudonym));
        row.target_author = row
            .target_author
            .take()
            .and_then(|t| mapping.get(t.as_str()).map(|p| p.to_string()));
    }

    Ok((rows, delta))
}
