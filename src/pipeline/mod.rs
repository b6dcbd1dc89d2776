//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Walk boards, merge new posts into state, write the report
//! - `run_report`: Re-render the report from saved state

pub mod crawl;
pub mod merge;
pub mod report;

pub use crawl::{CrawlSummary, run_crawler, run_report};
pub use merge::{Clock, MergeOutcome, fixed_clock, merge_board, system_clock};
pub use report::{ReportInput, ReportSection, render_html};
