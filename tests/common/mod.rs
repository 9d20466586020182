#![allow(dead_code)]

use fetl::{
    CategoryScores, EnrichedRow, MappingEntry, RawRecord, RecordKind, RecordStore, TextItem,
    ToxicityClassifier, ToxicityRow,
};
use ahash::AHashSet;
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Raw submission record for fixtures. `author: None` models a deleted
/// account.
pub fn submission(id: &str, author: Option<&str>, created_utc: i64, community: &str) -> RawRecord {
    RawRecord {
        kind: RecordKind::Submission,
        submission_id: id.to_string(),
        id: id.to_string(),
        author: author.map(|s| s.to_string()),
        parent_id: None,
        title: Some(format!("title of {id}")),
        body: Some(format!("body of {id}")),
        score: 1,
        created_utc,
        permalink: Some(format!("/r/{community}/comments/{id}/title/")),
    }
}

/// Raw comment record for fixtures.
pub fn comment(
    id: &str,
    submission_id: &str,
    parent_id: &str,
    author: Option<&str>,
    created_utc: i64,
) -> RawRecord {
    RawRecord {
        kind: RecordKind::Comment,
        submission_id: submission_id.to_string(),
        id: id.to_string(),
        author: author.map(|s| s.to_string()),
        parent_id: Some(parent_id.to_string()),
        title: None,
        body: Some(format!("body of {id}")),
        score: 1,
        created_utc,
        permalink: Some(format!("/r/gaming/comments/{submission_id}/title/{id}/")),
    }
}

/// Canonical three-record batch: S1 (alice), S2 (deleted author), C1 (alice
/// replying to S1).
pub fn scenario_batch() -> Vec<RawRecord> {
    vec![
        submission("s1", Some("alice"), 100, "gaming"),
        submission("s2", None, 150, "gaming"),
        comment("c1", "s1", "s1", Some("alice"), 200),
    ]
}

/// Write records as one plain NDJSON batch file.
pub fn write_jsonl_batch(path: &Path, records: &[RawRecord]) {
    let mut f = File::create(path).unwrap();
    for r in records {
        writeln!(&mut f, "{}", serde_json::to_string(r).unwrap()).unwrap();
    }
}

/// Write records as one zstd-compressed NDJSON batch file.
pub fn write_zst_batch(path: &Path, records: &[RawRecord]) {
    let f = File::create(path).unwrap();
    let mut enc = zstd_writer(f);
    for r in records {
        writeln!(&mut enc, "{}", serde_json::to_string(r).unwrap()).unwrap();
    }
    enc.finish().unwrap();
}

fn zstd_writer(f: File) -> zstd::stream::write::Encoder<'static, File> {
    zstd::stream::write::Encoder::new(f, 3).unwrap()
}

/// Read a JSONL table file into `serde_json::Value`s (skips empty lines).
pub fn read_jsonl_values(path: &Path) -> Vec<serde_json::Value> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines()
        .map(|l| l.unwrap())
        .filter(|s| !s.is_empty())
        .map(|s| serde_json::from_str(&s).unwrap())
        .collect()
}

/// Deterministic classifier stub that records every dispatched chunk.
/// Scores: `toxic` is 0.9 when the text contains "awful", else 0.1; the
/// other categories stay 0.
#[derive(Default)]
pub struct RecordingClassifier {
    pub chunks: RefCell<Vec<Vec<String>>>,
}

impl ToxicityClassifier for RecordingClassifier {
    fn classify(&self, texts: &[String]) -> Result<Vec<CategoryScores>> {
        self.chunks.borrow_mut().push(texts.to_vec());
        Ok(texts
            .iter()
            .map(|t| CategoryScores {
                toxic: if t.contains("awful") { 0.9 } else { 0.1 },
                ..Default::default()
            })
            .collect())
    }
}

impl RecordingClassifier {
    pub fn dispatched_chunk_sizes(&self) -> Vec<usize> {
        self.chunks.borrow().iter().map(|c| c.len()).collect()
    }
}

/// Store stand-in whose every operation fails, for exercising the
/// collaborator-failure fallback policy.
pub struct FailingStore;

impl RecordStore for FailingStore {
    fn known_post_ids(&self, _table: &str) -> Result<AHashSet<String>> {
        Err(anyhow!("database unreachable"))
    }
    fn username_mapping(&self, _table: &str) -> Result<Vec<MappingEntry>> {
        Err(anyhow!("database unreachable"))
    }
    fn insert_posts(&mut self, _rows: &[EnrichedRow], _table: &str) -> Result<()> {
        Err(anyhow!("database unreachable"))
    }
    fn insert_mappings(&mut self, _rows: &[MappingEntry], _table: &str) -> Result<()> {
        Err(anyhow!("database unreachable"))
    }
    fn insert_scores(&mut self, _rows: &[ToxicityRow], _table: &str) -> Result<()> {
        Err(anyhow!("database unreachable"))
    }
    fn fetch_bodies(&self, _ids: &AHashSet<String>, _table: &str) -> Result<Vec<TextItem>> {
        Err(anyhow!("database unreachable"))
    }
}
