//! Persisted crawl state.
//!
//! ```text
//! {
//!   "<board name>": {
//!     "<post id>": { "title", "detected_at", "detail_url", "attachments": [...] }
//!   }
//! }
//! ```
//!
//! Entries are only ever added. Attachment lists only grow.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::models::{Attachment, Post};

/// Posts recorded for one board, keyed by post id.
pub type BoardState = BTreeMap<String, PostRecord>;

/// A post as recorded in the state file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    pub title: String,

    /// When the post was first discovered
    pub detected_at: DateTime<FixedOffset>,

    pub detail_url: String,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl PostRecord {
    pub fn to_post(&self, id: &str) -> Post {
        Post {
            id: id.to_string(),
            title: self.title.clone(),
            detail_url: self.detail_url.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

/// Board name → post id → record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct State {
    boards: BTreeMap<String, BoardState>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, board: &str, id: &str) -> bool {
        self.boards
            .get(board)
            .is_some_and(|posts| posts.contains_key(id))
    }

    pub fn get(&self, board: &str, id: &str) -> Option<&PostRecord> {
        self.boards.get(board)?.get(id)
    }

    pub fn posts(&self, board: &str) -> Option<&BoardState> {
        self.boards.get(board)
    }

    pub fn boards(&self) -> impl Iterator<Item = (&String, &BoardState)> {
        self.boards.iter()
    }

    /// Record a newly discovered post. An existing entry is never overwritten.
    ///
    /// Returns `true` if the post was inserted.
    pub fn insert_new(&mut self, board: &str, id: &str, record: PostRecord) -> bool {
        let posts = self.boards.entry(board.to_string()).or_default();
        if posts.contains_key(id) {
            return false;
        }
        posts.insert(id.to_string(), record);
        true
    }

    /// Append attachments whose `(name, url)` pair is not yet recorded.
    ///
    /// Existing order is preserved. Returns the number of attachments added,
    /// or 0 if the post is unknown.
    pub fn merge_attachments(
        &mut self,
        board: &str,
        id: &str,
        attachments: &[Attachment],
    ) -> usize {
        let Some(record) = self.boards.get_mut(board).and_then(|posts| posts.get_mut(id)) else {
            return 0;
        };

        let mut seen: HashSet<(String, String)> = record
            .attachments
            .iter()
            .map(|a| (a.name.clone(), a.url.clone()))
            .collect();

        let mut added = 0;
        for attachment in attachments {
            let (name, url) = attachment.key();
            if seen.insert((name.to_string(), url.to_string())) {
                record.attachments.push(attachment.clone());
                added += 1;
            }
        }
        added
    }

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    pub fn post_count(&self) -> usize {
        self.boards.values().map(|posts| posts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.post_count() == 0
    }

    /// Most recent discovery time across all boards.
    pub fn latest_detection(&self) -> Option<DateTime<FixedOffset>> {
        self.boards
            .values()
            .flat_map(|posts| posts.values())
            .map(|r| r.detected_at)
            .max()
    }
}
