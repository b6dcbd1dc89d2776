// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod board;
mod config;
mod post;
mod state;
mod step;

// Re-export all public types
pub use board::BoardConfig;
pub use config::{
    Config, CrawlerConfig, MergeConfig, MergePolicy, PathsConfig, ReportConfig, ReportScope,
    SiteConfig,
};
pub use post::{Attachment, Post, PostStub};
pub use state::{BoardState, PostRecord, State};
pub use step::Step;
