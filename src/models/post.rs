//! Post and attachment data structures.

use serde::{Deserialize, Serialize};

/// A post entry as found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStub {
    /// Identifier passed to the detail-view function
    pub id: String,

    /// Link text of the listing anchor
    pub title: String,
}

/// A post with its detail link and attachments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub detail_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A downloadable file linked from a detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Attachment {
    /// Display filename
    pub name: String,

    /// Download URL
    pub url: String,
}

impl Attachment {
    /// Identity used when merging attachment lists.
    pub fn key(&self) -> (&str, &str) {
        (&self.name, &self.url)
    }
}
