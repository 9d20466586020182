mod config;
mod date;
mod diff;
mod enrich;
mod ndjson;
mod pipeline;
mod progress;
mod pseudonym;
mod record;
mod scoring;
mod source;
mod store;
mod transform;
mod util;

pub use crate::config::EtlConfig;
pub use crate::pipeline::{ForumETL, RunSummary};
pub use crate::record::{EnrichedRow, MappingEntry, RawRecord, RecordKind};

// Core stages, usable standalone.
pub use crate::diff::filter_new;
pub use crate::enrich::community_of;
pub use crate::pseudonym::{allocate, PseudonymCursor};
pub use crate::transform::{anonymize, transform, TransformInput};

// Collaborator boundaries.
pub use crate::scoring::{
    score_rows, CategoryScores, TextItem, ToxicityClassifier, ToxicityRow, CATEGORIES,
};
pub use crate::source::{
    flatten_threads, CommentNode, ForumClient, ThreadSnapshot, MAX_THREAD_NODES,
};
pub use crate::store::{
    known_ids_or_fallback, mapping_or_fallback, observe_insert, FallbackPolicy, JsonlStore,
    RecordStore,
};

// NDJSON helpers.
pub use crate::ndjson::{NdjsonReader, NdjsonWriter};

pub use crate::util::init_tracing_once;
