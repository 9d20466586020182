//! Harvesting boundary: the client that talks to the forum is external; the
//! core only needs the thread snapshots it returns, flattened into raw
//! records.

use crate::record::{RawRecord, RecordKind};
use anyhow::Result;

/// Cap on flattened comment nodes per submission. Pathologically deep or
/// wide reply trees are truncated (with a warning) instead of walked
/// without bound.
pub const MAX_THREAD_NODES: usize = 50_000;

/// One comment and its replies, as fetched by the client.
#[derive(Clone, Debug, Default)]
pub struct CommentNode {
    pub id: String,
    pub author: Option<String>,
    pub body: Option<String>,
    pub score: i64,
    pub created_utc: i64,
    pub permalink: Option<String>,
    pub replies: Vec<CommentNode>,
}

/// One submission with its full comment tree.
#[derive(Clone, Debug, Default)]
pub struct ThreadSnapshot {
    pub submission_id: String,
    pub author: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub score: i64,
    pub created_utc: i64,
    pub permalink: Option<String>,
    pub comments: Vec<CommentNode>,
}

/// External harvesting client. Network behavior, credentials, and retries
/// all live behind this trait.
pub trait ForumClient {
    fn harvest(&self, community: &str, limit: usize) -> Result<Vec<ThreadSnapshot>>;
}

/// Flatten thread snapshots into the raw record batch the transform expects.
///
/// Submissions carry `parent_id = None`; a top-level comment's parent is the
/// submission id; deeper replies point at their parent comment. The reply
/// walk is an explicit stack (depth-first, replies in fetch order), bounded
/// by `max_nodes` per submission.
pub fn flatten_threads(threads: Vec<ThreadSnapshot>, max_nodes: usize) -> Vec<RawRecord> {
    let mut records = Vec::new();

    for thread in threads {
        let submission_id = thread.submission_id.clone();
        records.push(RawRecord {
            kind: RecordKind::Submission,
            submission_id: submission_id.clone(),
            id: thread.submission_id,
            author: thread.author,
            parent_id: None,
            title: thread.title,
            body: thread.body,
            score: thread.score,
            created_utc: thread.created_utc,
            permalink: thread.permalink,
        });

        // (node, parent id) work stack; children pushed in reverse so the
        // output keeps fetch order.
        let mut stack: Vec<(CommentNode, String)> = Vec::new();
        for comment in thread.comments.into_iter().rev() {
            stack.push((comment, submission_id.clone()));
        }

        let mut visited = 0usize;
        while let Some((node, parent_id)) = stack.pop() {
            if visited >= max_nodes {
                tracing::warn!(
                    submission_id = %submission_id,
                    max_nodes,
                    "comment tree truncated at node cap"
                );
                break;
            }
            visited += 1;

            let node_id = node.id.clone();
            records.push(RawRecord {
                kind: RecordKind::Comment,
                submission_id: submission_id.clone(),
                id: node.id,
                author: node.author,
                parent_id: Some(parent_id),
                title: None,
                body: node.body,
                score: node.score,
                created_utc: node.created_utc,
                permalink: node.permalink,
            });

            for reply in node.replies.into_iter().rev() {
                stack.push((reply, node_id.clone()));
            }
        }
    }

    records
}
