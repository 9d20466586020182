//! Row types shared across the pipeline stages.
//!
//! `EnrichedRow` field order is the external column contract: downstream
//! consumers of the posts table rely on the serialized key order, so new
//! fields must not be inserted in the middle.

use serde::{Deserialize, Serialize};

/// Kind of a raw unit: a thread-opening submission or a comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Submission,
    Comment,
}

/// One raw unit as produced by the harvesting client.
///
/// `author` is `None` when the account was removed. `parent_id` is `None`
/// for submissions and equals `submission_id` for top-level comments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub submission_id: String,
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub score: i64,
    pub created_utc: i64,
    #[serde(default)]
    pub permalink: Option<String>,
}

/// Fully transformed row, ready for the posts table.
///
/// `author` and `target_author` hold real handles after `transform` and
/// pseudonyms after `anonymize`; `original_author` is only populated by
/// `anonymize` and is stripped again before the row is persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrichedRow {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub submission_id: String,
    pub post_id: String,
    #[serde(default)]
    pub target_post_id: Option<String>,
    pub author: String,
    #[serde(default)]
    pub target_author: Option<String>,
    #[serde(default)]
    pub community: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub score: i64,
    pub number_of_replies: u64,
    pub date: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_author: Option<String>,
}

/// One row of the accumulated pseudonym mapping table.
///
/// The on-disk column for the pseudonym keeps its historical name
/// `new_username`; every existing mapping table uses it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub original_author: String,
    #[serde(rename = "new_username")]
    pub pseudonym: String,
}

impl MappingEntry {
    pub fn new(original_author: impl Into<String>, pseudonym: impl Into<String>) -> Self {
        Self { original_author: original_author.into(), pseudonym: pseudonym.into() }
    }
}
