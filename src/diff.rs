//! Incremental diff: keep only rows not yet persisted.

use crate::record::EnrichedRow;
use ahash::AHashSet;

/// Pure set-filter: a row is new iff its `post_id` is not in `known_ids`.
///
/// Empty candidates short-circuit to empty with no further work; an empty
/// known-id set means everything is new, not an error.
pub fn filter_new(rows: Vec<EnrichedRow>, known_ids: &AHashSet<String>) -> Vec<EnrichedRow> {
    if rows.is_empty() || known_ids.is_empty() {
        return rows;
    }
    rows.into_iter().filter(|r| !known_ids.contains(&r.post_id)).collect()
}
