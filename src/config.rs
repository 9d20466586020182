use crate::store::FallbackPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// User-facing settings with sensible defaults, builder chaining, and YAML
/// file loading (the `settings.yaml` of a deployment).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Community (subreddit-style name) handed to the harvesting client.
    pub target_community: String,
    /// Maximum submissions fetched per harvest run.
    pub harvest_limit: usize,
    /// Texts per classifier dispatch.
    pub chunk_size: usize,
    /// Cap on rows scored by one backfill pass.
    pub backfill_limit: usize,
    /// Default tracing level; `RUST_LOG` overrides it.
    pub log_level: String,
    /// Show a progress bar during scoring.
    pub progress: bool,
    /// Degradation policy for lookup collaborator failures.
    pub fallback: FallbackPolicy,

    pub posts_table: String,
    pub authors_table: String,
    pub toxicity_table: String,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            target_community: "gaming".to_string(),
            harvest_limit: 1,
            chunk_size: 128,
            backfill_limit: 10_000,
            log_level: "info".to_string(),
            progress: true,
            fallback: FallbackPolicy::default(),
            posts_table: "forum_posts".to_string(),
            authors_table: "unique_authors".to_string(),
            toxicity_table: "toxicity_results".to_string(),
        }
    }
}

impl EtlConfig {
    /// Load settings from a YAML file. Unknown keys are ignored; missing
    /// keys fall back to the defaults above.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read settings {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parse settings {}", path.display()))
    }

    pub fn with_target_community(mut self, community: impl Into<String>) -> Self {
        self.target_community = community.into();
        self
    }
    pub fn with_harvest_limit(mut self, limit: usize) -> Self {
        self.harvest_limit = limit.max(1);
        self
    }
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
    pub fn with_backfill_limit(mut self, limit: usize) -> Self {
        self.backfill_limit = limit;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy;
        self
    }
}
