// src/services/extract.rs

//! Markup extraction rules.
//!
//! Each rule maps raw page markup to a list of matches and knows nothing
//! about the network. Site markup changes should only touch this module.
//!
//! - Listing pages link posts as `javascript:fn_DetailInfo('<id>', ...)`.
//! - Pagination controls call a page-jump function with the page number.
//! - Detail pages link files as `onclick="gfn_downloadAttFile3nd('<seq>','<no>')"`.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Attachment, PostStub};
use crate::utils::normalize_whitespace;

/// Title used when a post anchor has no visible text.
pub const UNTITLED: &str = "(제목 없음)";

/// Name used when an attachment anchor has no visible text.
pub const UNNAMED_ATTACHMENT: &str = "첨부파일";

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn anchor_text(anchor: &ElementRef<'_>) -> String {
    normalize_whitespace(&anchor.text().collect::<String>())
}

/// Finds the last listing page from page-jump controls.
#[derive(Debug, Clone)]
pub struct PaginationRule {
    pattern: Regex,
    container: Selector,
    anchors: Selector,
}

impl PaginationRule {
    /// `pattern` must have one capture group holding the page number.
    /// `container` selects the pagination block whose anchors are scanned.
    pub fn new(pattern: &str, container: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            container: parse_selector(container)?,
            anchors: parse_selector("a")?,
        })
    }

    /// Largest page number referenced by a page-jump anchor, or 1 if there is none.
    ///
    /// Only anchors inside the pagination container count. Pages without
    /// such a container are scanned whole.
    pub fn last_page(&self, html: &str) -> u32 {
        let document = Html::parse_document(html);

        let scoped: Vec<ElementRef<'_>> = document
            .select(&self.container)
            .flat_map(|block| block.select(&self.anchors))
            .collect();
        let anchors = if scoped.is_empty() {
            document.select(&self.anchors).collect()
        } else {
            scoped
        };

        anchors
            .iter()
            .flat_map(|a| {
                let el = a.value();
                [el.attr("href"), el.attr("onclick")]
            })
            .flatten()
            .flat_map(|value| self.pattern.captures_iter(value))
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

/// Finds post links on a listing page.
#[derive(Debug, Clone)]
pub struct DetailLinkRule {
    pattern: Regex,
    anchors: Selector,
}

impl DetailLinkRule {
    /// Match calls to the client-side function `detail_fn`.
    pub fn new(detail_fn: &str) -> Result<Self> {
        let pattern = format!(r#"\b{}\s*\(\s*['"]([^'"]*)['"]"#, regex::escape(detail_fn));
        Ok(Self {
            pattern: Regex::new(&pattern)?,
            anchors: parse_selector("a[href], a[onclick]")?,
        })
    }

    /// Post stubs in document order. Anchors without a quoted id are skipped.
    pub fn extract_posts(&self, html: &str) -> Vec<PostStub> {
        let document = Html::parse_document(html);
        let mut posts = Vec::new();

        for anchor in document.select(&self.anchors) {
            let el = anchor.value();
            let id = [el.attr("href"), el.attr("onclick")]
                .into_iter()
                .flatten()
                .find_map(|value| self.pattern.captures(value))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string());

            let Some(id) = id.filter(|id| !id.is_empty()) else {
                continue;
            };

            let title = anchor_text(&anchor);
            posts.push(PostStub {
                id,
                title: if title.is_empty() {
                    UNTITLED.to_string()
                } else {
                    title
                },
            });
        }

        posts
    }
}

/// Finds attachment download links on a detail page.
#[derive(Debug, Clone)]
pub struct DownloadLinkRule {
    pattern: Regex,
    anchors: Selector,
    endpoint: Url,
}

impl DownloadLinkRule {
    /// Match two-argument calls to `download_fn`, building URLs against
    /// `download_path` on `base_url`.
    pub fn new(download_fn: &str, base_url: &str, download_path: &str) -> Result<Self> {
        let pattern = format!(
            r#"\b{}\s*\(\s*['"]([^'"]*)['"]\s*,\s*['"]([^'"]*)['"]\s*\)"#,
            regex::escape(download_fn)
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
            anchors: parse_selector("a[onclick]")?,
            endpoint: Url::parse(base_url)?.join(download_path)?,
        })
    }

    /// Download URL for an encrypted sequence id and file number.
    pub fn download_url(&self, enc_seq: &str, file_no: &str) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("encAthflSeq", enc_seq)
            .append_pair("atchFsno", file_no);
        url.to_string()
    }

    /// Attachments in document order.
    pub fn extract_attachments(&self, html: &str) -> Vec<Attachment> {
        let document = Html::parse_document(html);
        let mut attachments = Vec::new();

        for anchor in document.select(&self.anchors) {
            let Some(onclick) = anchor.value().attr("onclick") else {
                continue;
            };
            let Some(caps) = self.pattern.captures(onclick) else {
                continue;
            };

            let name = anchor_text(&anchor);
            attachments.push(Attachment {
                name: if name.is_empty() {
                    UNNAMED_ATTACHMENT.to_string()
                } else {
                    name
                },
                url: self.download_url(&caps[1], &caps[2]),
            });
        }

        attachments
    }
}
