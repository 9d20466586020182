//! Relational enrichment over one transformed batch: community extraction,
//! parent-author resolution, and reply counting. Pure functions of the batch.

use crate::transform::StagedRow;
use ahash::AHashMap;

/// Extract the community from a forum-style permalink (`/r/<community>/...`):
/// the third `/`-separated path segment. Malformed or short paths yield
/// `None` rather than an error.
pub fn community_of(id_url: &str) -> Option<String> {
    let segment = id_url.split('/').nth(2)?;
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

/// Derive the `community` column from each row's `id_url`.
pub(crate) fn derive_community(rows: &mut [StagedRow]) {
    for row in rows.iter_mut() {
        row.community = row.id_url.as_deref().and_then(community_of);
    }
}

/// Resolve `target_author` by mapping `target_post_id` through a one-shot
/// `post_id -> author` lookup built over the same batch.
///
/// A parent persisted in a prior run is not in the lookup; its reply keeps
/// `target_author = None`. Known scope limitation, not silently worked around.
pub(crate) fn derive_target_authors(rows: &mut [StagedRow]) {
    let id_to_author: AHashMap<&str, &str> = rows
        .iter()
        .map(|r| (r.post_id.as_str(), r.author.as_str()))
        .collect();

    let resolved: Vec<Option<String>> = rows
        .iter()
        .map(|r| {
            r.target_post_id
                .as_deref()
                .and_then(|t| id_to_author.get(t))
                .map(|a| a.to_string())
        })
        .collect();

    for (row, target_author) in rows.iter_mut().zip(resolved) {
        row.target_author = target_author;
    }
}

/// Derive `number_of_replies`: how many rows in the batch point at this row's
/// `post_id`. Rows nothing replies to get `0`, never null.
pub(crate) fn derive_reply_counts(rows: &mut [StagedRow]) {
    let mut counts: AHashMap<&str, u64> = AHashMap::with_capacity(rows.len());
    for row in rows.iter() {
        if let Some(target) = row.target_post_id.as_deref() {
            *counts.entry(target).or_insert(0) += 1;
        }
    }

    let per_row: Vec<u64> = rows
        .iter()
        .map(|r| counts.get(r.post_id.as_str()).copied().unwrap_or(0))
        .collect();

    for (row, n) in rows.iter_mut().zip(per_row) {
        row.number_of_replies = n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_is_third_path_segment() {
        assert_eq!(community_of("/r/gaming/comments/abc/title/").as_deref(), Some("gaming"));
        assert_eq!(community_of("/r/rust/").as_deref(), Some("rust"));
    }

    #[test]
    fn malformed_permalink_yields_none() {
        assert_eq!(community_of("nonsense"), None);
        assert_eq!(community_of("/r/"), None);
        assert_eq!(community_of(""), None);
    }
}
