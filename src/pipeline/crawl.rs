// src/pipeline/crawl.rs

//! Board crawling pipeline.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{BoardConfig, Config, Post, ReportScope};
use crate::pipeline::merge::{Clock, merge_board};
use crate::pipeline::report::{ReportInput, render_html};
use crate::services::BoardCrawler;
use crate::storage::StateStorage;
use crate::utils::http::PageFetcher;

/// Totals for one crawl run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub boards: usize,
    pub pages_total: usize,
    pub pages_failed: usize,
    pub posts_seen: usize,
    pub new_posts: usize,
    pub attachments_added: usize,
    pub details_fetched: usize,
    pub details_failed: usize,
    /// Whether the state file was written
    pub state_saved: bool,
}

/// Run an incremental crawl over `boards`.
///
/// State is loaded once, merged board by board in registry order, and saved
/// only if something changed. The report is rendered at the end.
pub async fn run_crawler(
    config: Arc<Config>,
    storage: &dyn StateStorage,
    fetcher: Arc<dyn PageFetcher>,
    clock: Clock,
    boards: &[BoardConfig],
) -> Result<CrawlSummary> {
    let crawler = BoardCrawler::new(Arc::clone(&config), fetcher)?;
    let policy = config.merge.policy;

    let mut state = storage.load_state().await?;
    let mut summary = CrawlSummary {
        boards: boards.len(),
        ..CrawlSummary::default()
    };
    let mut dirty = false;
    let mut new_by_board: Vec<(String, Vec<Post>)> = Vec::new();

    log::info!(
        "Crawling {} board(s) with policy {}",
        boards.len(),
        policy
    );

    for board in boards {
        let walk = crawler.walk(board).await?;
        summary.pages_total += walk.pages_total;
        summary.pages_failed += walk.pages_failed;

        let outcome = merge_board(&crawler, board, &walk.posts, &mut state, policy, &clock).await;
        summary.posts_seen += outcome.posts_seen;
        summary.new_posts += outcome.new_posts.len();
        summary.attachments_added += outcome.attachments_added;
        summary.details_fetched += outcome.details_fetched;
        summary.details_failed += outcome.details_failed;

        log::info!(
            "{}: {} post(s) listed, {} new, {} page(s) failed, {} detail(s) failed",
            board.name,
            outcome.posts_seen,
            outcome.new_posts.len(),
            walk.pages_failed,
            outcome.details_failed
        );

        if outcome.changed() {
            dirty = true;
            if config.merge.save_per_board {
                storage.save_state(&state).await?;
                summary.state_saved = true;
                dirty = false;
            }
        }
        new_by_board.push((board.name.clone(), outcome.new_posts));
    }

    if dirty {
        storage.save_state(&state).await?;
        summary.state_saved = true;
    } else if !summary.state_saved {
        log::info!("No changes; state left untouched");
    }

    let generated_on = clock().date_naive();
    let input = match config.report.scope {
        ReportScope::New => {
            ReportInput::from_posts(&config.report.title, generated_on, new_by_board)
        }
        ReportScope::All => {
            ReportInput::from_state(&config.report.title, generated_on, &state, boards)
        }
    };
    storage.write_report(&render_html(&input)).await?;
    log::info!(
        "Report with {} post(s) written to {}",
        input.post_count(),
        storage.report_location()
    );

    log::info!(
        "Crawl summary: {} new, {} attachment(s) added, {}/{} pages failed, {}/{} details failed",
        summary.new_posts,
        summary.attachments_added,
        summary.pages_failed,
        summary.pages_total,
        summary.details_failed,
        summary.details_fetched
    );

    Ok(summary)
}

/// Render the report from saved state without touching the network.
pub async fn run_report(
    config: &Config,
    storage: &dyn StateStorage,
    clock: Clock,
    boards: &[BoardConfig],
) -> Result<usize> {
    let state = storage.load_state().await?;
    let input = ReportInput::from_state(&config.report.title, clock().date_naive(), &state, boards);
    storage.write_report(&render_html(&input)).await?;

    log::info!(
        "Report with {} post(s) written to {}",
        input.post_count(),
        storage.report_location()
    );
    Ok(input.post_count())
}
