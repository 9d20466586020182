//! Deterministic pseudonym allocation.
//!
//! Pseudonyms have the shape `user<block><letter>`: a zero-padded numeric
//! block (4 digits, widening past 9999 instead of wrapping) followed by one
//! lowercase letter. Issuance is strictly increasing and a pseudonym is never
//! reused or reassigned. Allocator state is an explicit [`PseudonymCursor`]
//! reconstructed from the supplied mapping table on every call; there is no
//! process-wide counter.

use crate::record::MappingEntry;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

fn pseudonym_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^user(\d{4,})([a-z])$").expect("static regex"))
}

/// Parse `user<digits><letter>` into `(block, letter_index)`.
fn parse_pseudonym(s: &str) -> Result<(u64, u8)> {
    let caps = pseudonym_re()
        .captures(s)
        .with_context(|| format!("malformed pseudonym in mapping table: {s:?}"))?;
    let block: u64 = caps[1].parse().with_context(|| format!("pseudonym block: {s:?}"))?;
    let letter = caps[2].as_bytes()[0] - b'a';
    Ok((block, letter))
}

/// Position of the last issued pseudonym; `letter: None` means nothing has
/// been issued yet and the first advance yields `user0000a`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PseudonymCursor {
    block: u64,
    letter: Option<u8>,
}

impl PseudonymCursor {
    /// Fresh cursor: block 0, just before `a`.
    pub fn start() -> Self {
        Self { block: 0, letter: None }
    }

    /// Reconstruct the cursor from the maximal pseudonym already issued.
    ///
    /// The maximum is taken under parsed `(block, letter)` order, not raw
    /// string order, so blocks widened past 9999 keep sorting after their
    /// 4-digit predecessors. Any malformed pseudonym is a validation error.
    pub fn from_mapping(existing: &[MappingEntry]) -> Result<Self> {
        let mut max: Option<(u64, u8)> = None;
        for entry in existing {
            let parsed = parse_pseudonym(&entry.pseudonym)?;
            if max.map_or(true, |m| parsed > m) {
                max = Some(parsed);
            }
        }
        Ok(match max {
            None => Self::start(),
            Some((block, letter)) => Self { block, letter: Some(letter) },
        })
    }

    /// Issue the next pseudonym: the letter steps through `a..=z`, carrying
    /// into the numeric block on overflow.
    pub fn advance(&mut self) -> String {
        let next = match self.letter {
            None => 0,
            Some(l) if (l as usize) + 1 < ALPHABET.len() => l + 1,
            Some(_) => {
                self.block += 1;
                0
            }
        };
        self.letter = Some(next);
        format!("user{:04}{}", self.block, ALPHABET[next as usize] as char)
    }
}

/// Allocate pseudonyms for every author in `new_authors` that is not already
/// present in `existing`.
///
/// The assignment order across simultaneously-new authors is contractually
/// arbitrary; it is made deterministic here by issuing in sorted-handle
/// order. Returns the delta mapping rows (issuance order) and the cursor
/// after the last issue.
pub fn allocate<I, S>(
    existing: &[MappingEntry],
    new_authors: I,
) -> Result<(Vec<MappingEntry>, PseudonymCursor)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut cursor = PseudonymCursor::from_mapping(existing)?;

    let known: BTreeSet<&str> = existing.iter().map(|e| e.original_author.as_str()).collect();
    let candidates: BTreeSet<String> = new_authors.into_iter().map(Into::into).collect();

    let mut delta = Vec::new();
    for author in candidates {
        if author.is_empty() {
            bail!("empty author handle cannot be anonymized");
        }
        if known.contains(author.as_str()) {
            continue;
        }
        let pseudonym = cursor.advance();
        delta.push(MappingEntry { original_author: author, pseudonym });
    }
    Ok((delta, cursor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cursor_issues_user0000a_first() {
        let mut c = PseudonymCursor::start();
        assert_eq!(c.advance(), "user0000a");
        assert_eq!(c.advance(), "user0000b");
    }

    #[test]
    fn letter_overflow_carries_into_block() {
        let existing = vec![MappingEntry::new("x", "user0000z")];
        let mut c = PseudonymCursor::from_mapping(&existing).unwrap();
        assert_eq!(c.advance(), "user0001a");
    }

    #[test]
    fn block_widens_past_9999() {
        let existing = vec![MappingEntry::new("x", "user9999z")];
        let mut c = PseudonymCursor::from_mapping(&existing).unwrap();
        assert_eq!(c.advance(), "user10000a");
        assert_eq!(c.advance(), "user10000b");
    }

    #[test]
    fn widened_block_wins_cursor_reconstruction() {
        // user10000a must beat user9999z despite sorting lower as a string.
        let existing = vec![
            MappingEntry::new("a", "user9999z"),
            MappingEntry::new("b", "user10000a"),
        ];
        let mut c = PseudonymCursor::from_mapping(&existing).unwrap();
        assert_eq!(c.advance(), "user10000b");
    }

    #[test]
    fn malformed_pseudonym_is_rejected() {
        let existing = vec![MappingEntry::new("x", "user12")];
        assert!(PseudonymCursor::from_mapping(&existing).is_err());
        let existing = vec![MappingEntry::new("x", "bob")];
        assert!(PseudonymCursor::from_mapping(&existing).is_err());
    }

    #[test]
    fn known_authors_are_not_reallocated() {
        let existing = vec![MappingEntry::new("alice", "user0000a")];
        let (delta, _) = allocate(&existing, ["alice", "bob"]).unwrap();
        assert_eq!(delta, vec![MappingEntry::new("bob", "user0000b")]);
    }

    #[test]
    fn issued_pseudonyms_are_distinct_and_increasing() {
        let existing = vec![MappingEntry::new("seed", "user0000y")];
        let authors: Vec<String> = (0..30).map(|i| format!("author{i:02}")).collect();
        let (delta, _) = allocate(&existing, authors).unwrap();
        assert_eq!(delta.len(), 30);
        // Pairwise distinct, disjoint from existing, strictly increasing in
        // issuance order (all blocks stay 4-digit here, so string order holds).
        for pair in delta.windows(2) {
            assert!(pair[1].pseudonym > pair[0].pseudonym, "{pair:?}");
        }
        assert!(delta.iter().all(|e| e.pseudonym != "user0000y"));
        assert_eq!(delta[0].pseudonym, "user0000z");
        assert_eq!(delta[1].pseudonym, "user0001a");
    }
}
