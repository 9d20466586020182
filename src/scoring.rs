//! Batch toxicity scoring boundary.
//!
//! The classifier itself is a black box behind [`ToxicityClassifier`]; this
//! module owns the chunking policy: fixed-size chunks, dispatched strictly
//! sequentially in input order, never interleaved.

use crate::progress::make_count_progress;
use crate::record::EnrichedRow;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// The six fixed score categories, in contract order.
pub const CATEGORIES: [&str; 6] =
    ["toxic", "severe_toxic", "obscene", "threat", "insult", "identity_hate"];

/// Per-text probability-like scores in `[0, 1]`, one per category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub toxic: f64,
    pub severe_toxic: f64,
    pub obscene: f64,
    pub threat: f64,
    pub insult: f64,
    pub identity_hate: f64,
}

impl CategoryScores {
    /// Derived overall score: the maximum of the six categories.
    pub fn overall(&self) -> f64 {
        [self.toxic, self.severe_toxic, self.obscene, self.threat, self.insult, self.identity_hate]
            .into_iter()
            .fold(0.0_f64, f64::max)
    }
}

/// `(post_id, body)` input pair for scoring.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextItem {
    pub post_id: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl From<&EnrichedRow> for TextItem {
    fn from(row: &EnrichedRow) -> Self {
        Self { post_id: row.post_id.clone(), body: row.body.clone() }
    }
}

/// One scored row for the toxicity table. `body` is carried through scoring
/// and stripped before insertion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToxicityRow {
    pub post_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub scores: CategoryScores,
    pub overall_toxicity: f64,
}

/// Black-box batch classifier: one score set per input text, same order.
pub trait ToxicityClassifier {
    fn classify(&self, texts: &[String]) -> Result<Vec<CategoryScores>>;
}

/// Score `items` in fixed-size chunks, in input order.
///
/// Empty input returns empty with no chunk dispatched. Absent bodies are
/// scored as empty strings. A classifier returning the wrong number of
/// score sets violates the boundary contract and fails the run.
pub fn score_rows(
    classifier: &dyn ToxicityClassifier,
    items: &[TextItem],
    chunk_size: usize,
    progress: bool,
) -> Result<Vec<ToxicityRow>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let chunk_size = chunk_size.max(1);

    let pb = if progress {
        Some(make_count_progress(items.len() as u64, "Scoring toxicity"))
    } else {
        None
    };

    let mut out = Vec::with_capacity(items.len());
    for chunk in items.chunks(chunk_size) {
        let texts: Vec<String> =
            chunk.iter().map(|i| i.body.clone().unwrap_or_default()).collect();
        let scores = classifier.classify(&texts)?;
        ensure!(
            scores.len() == chunk.len(),
            "classifier returned {} score sets for {} texts",
            scores.len(),
            chunk.len()
        );
        for (item, scores) in chunk.iter().zip(scores) {
            out.push(ToxicityRow {
                post_id: item.post_id.clone(),
                body: item.body.clone(),
                overall_toxicity: scores.overall(),
                scores,
            });
        }
        if let Some(pb) = &pb {
            pb.inc(chunk.len() as u64);
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("scoring done");
    }
    Ok(out)
}
