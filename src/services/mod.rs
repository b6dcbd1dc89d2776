//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Listing and detail fetching (`BoardCrawler`)
//! - Markup extraction rules (`PaginationRule`, `DetailLinkRule`, `DownloadLinkRule`)

mod board;
pub mod extract;

pub use board::{BoardCrawler, WalkOutcome};
pub use extract::{DetailLinkRule, DownloadLinkRule, PaginationRule};
