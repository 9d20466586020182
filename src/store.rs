//! Persistence boundary: known-id lookup, mapping lookup, bulk insert.
//!
//! The core never talks to storage directly; it goes through [`RecordStore`]
//! wrapped by the [`FallbackPolicy`] helpers below. The file-backed
//! [`JsonlStore`] keeps one NDJSON file per table and is what the CLI and
//! the tests run against.

use crate::ndjson::{NdjsonReader, NdjsonWriter};
use crate::record::{EnrichedRow, MappingEntry};
use crate::scoring::{TextItem, ToxicityRow};
use ahash::AHashSet;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage collaborator interface. Lookup failures are the collaborator's
/// own errors; degradation policy is applied by the caller via
/// [`known_ids_or_fallback`] / [`mapping_or_fallback`].
pub trait RecordStore {
    /// Ids already persisted in `table`. A missing table is an empty set,
    /// not an error.
    fn known_post_ids(&self, table: &str) -> Result<AHashSet<String>>;

    /// The full accumulated pseudonym mapping from `table`.
    fn username_mapping(&self, table: &str) -> Result<Vec<MappingEntry>>;

    fn insert_posts(&mut self, rows: &[EnrichedRow], table: &str) -> Result<()>;
    fn insert_mappings(&mut self, rows: &[MappingEntry], table: &str) -> Result<()>;
    fn insert_scores(&mut self, rows: &[ToxicityRow], table: &str) -> Result<()>;

    /// `(post_id, body)` pairs for the given ids; used by the backfill pass.
    fn fetch_bodies(&self, ids: &AHashSet<String>, table: &str) -> Result<Vec<TextItem>>;
}

/// What to do when a lookup collaborator fails.
///
/// `EmptyOnError` preserves the historical behavior: swallow the failure,
/// log it, and substitute an empty result. For the known-id set this is a
/// silent-data-loss hazard — a transient outage makes every candidate row
/// look new and the run re-inserts duplicates downstream. `Abort` turns the
/// same failure into a hard error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    EmptyOnError,
    Abort,
}

/// Known-id lookup with the degradation policy applied.
pub fn known_ids_or_fallback(
    store: &dyn RecordStore,
    table: &str,
    policy: FallbackPolicy,
) -> Result<AHashSet<String>> {
    match store.known_post_ids(table) {
        Ok(ids) => Ok(ids),
        Err(e) => match policy {
            FallbackPolicy::EmptyOnError => {
                tracing::error!(
                    table,
                    error = %e,
                    "could not fetch known post ids; treating every candidate row as new"
                );
                Ok(AHashSet::new())
            }
            FallbackPolicy::Abort => Err(e.context(format!("fetch known ids from {table}"))),
        },
    }
}

/// Mapping lookup with the degradation policy applied.
pub fn mapping_or_fallback(
    store: &dyn RecordStore,
    table: &str,
    policy: FallbackPolicy,
) -> Result<Vec<MappingEntry>> {
    match store.username_mapping(table) {
        Ok(mapping) => Ok(mapping),
        Err(e) => match policy {
            FallbackPolicy::EmptyOnError => {
                tracing::error!(
                    table,
                    error = %e,
                    "could not fetch username mapping; starting from an empty mapping"
                );
                Ok(Vec::new())
            }
            FallbackPolicy::Abort => Err(e.context(format!("fetch mapping from {table}"))),
        },
    }
}

/// Insert failures are observed and logged, never re-thrown to the caller.
/// Documented (and debatable) policy carried over from the original system.
pub fn observe_insert(result: Result<()>, table: &str) {
    match result {
        Ok(()) => {}
        Err(e) => tracing::error!(table, error = %e, "insert failed"),
    }
}

/// File-backed store: `<dir>/<table>.jsonl`, append-only inserts.
pub struct JsonlStore {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    post_id: String,
}

impl JsonlStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }

    /// Read every row of `table`, skipping nothing: a malformed line is a
    /// corrupt table and surfaces as an error.
    fn read_table<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = NdjsonReader::open(&path, 256 * 1024)?;
        let mut rows = Vec::new();
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
            let row: T = serde_json::from_str(&buf)
                .with_context(|| format!("{}:{line_no}: malformed row", path.display()))?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn append_rows<T: serde::Serialize>(&self, rows: &[T], table: &str) -> Result<()> {
        if rows.is_empty() {
            tracing::info!(table, "no new records to insert");
            return Ok(());
        }
        let path = self.table_path(table);
        let mut w = NdjsonWriter::append(&path, 256 * 1024)?;
        for row in rows {
            w.write_json(row)?;
        }
        w.finish()?;
        tracing::info!(table, rows = rows.len(), "records inserted");
        Ok(())
    }
}

impl RecordStore for JsonlStore {
    fn known_post_ids(&self, table: &str) -> Result<AHashSet<String>> {
        let rows: Vec<IdOnly> = self.read_table(table)?;
        Ok(rows.into_iter().map(|r| r.post_id).collect())
    }

    fn username_mapping(&self, table: &str) -> Result<Vec<MappingEntry>> {
        self.read_table(table)
    }

    fn insert_posts(&mut self, rows: &[EnrichedRow], table: &str) -> Result<()> {
        self.append_rows(rows, table)
    }

    fn insert_mappings(&mut self, rows: &[MappingEntry], table: &str) -> Result<()> {
        self.append_rows(rows, table)
    }

    fn insert_scores(&mut self, rows: &[ToxicityRow], table: &str) -> Result<()> {
        self.append_rows(rows, table)
    }

    fn fetch_bodies(&self, ids: &AHashSet<String>, table: &str) -> Result<Vec<TextItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<TextItem> = self.read_table(table)?;
        Ok(rows.into_iter().filter(|r| ids.contains(&r.post_id)).collect())
    }
}
