//! Incremental state merge.
//!
//! Decides which discovered posts need their detail page fetched and records
//! the results in [`State`]. Recorded posts are never removed and their
//! attachment lists never shrink.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};

use crate::models::{BoardConfig, MergePolicy, Post, PostRecord, PostStub, State};
use crate::services::BoardCrawler;

/// Source of discovery timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<FixedOffset> + Send + Sync>;

/// Clock reading local wall time.
pub fn system_clock() -> Clock {
    Arc::new(|| Local::now().fixed_offset())
}

/// Clock that always returns `at`.
pub fn fixed_clock(at: DateTime<FixedOffset>) -> Clock {
    Arc::new(move || at)
}

/// Result of merging one board's walk into state.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Posts recorded for the first time, in discovery order
    pub new_posts: Vec<Post>,
    /// Attachments appended to posts that were already recorded
    pub attachments_added: usize,
    pub details_fetched: usize,
    pub details_failed: usize,
    /// Distinct post ids seen on the listing
    pub posts_seen: usize,
}

impl MergeOutcome {
    /// Whether state was mutated.
    pub fn changed(&self) -> bool {
        !self.new_posts.is_empty() || self.attachments_added > 0
    }
}

/// Merge a board's post stubs into state according to `policy`.
///
/// With [`MergePolicy::SkipKnown`] a recorded post is never fetched again.
/// With [`MergePolicy::RefreshAttachments`] every post is fetched and any
/// attachment with an unseen `(name, url)` pair is appended. Titles and
/// discovery times of recorded posts are left untouched under both.
pub async fn merge_board(
    crawler: &BoardCrawler,
    board: &BoardConfig,
    stubs: &[PostStub],
    state: &mut State,
    policy: MergePolicy,
    clock: &Clock,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let mut processed: HashSet<&str> = HashSet::new();

    for stub in stubs {
        if !processed.insert(stub.id.as_str()) {
            continue;
        }
        outcome.posts_seen += 1;

        let known = state.contains(&board.name, &stub.id);
        if known && policy == MergePolicy::SkipKnown {
            log::debug!("{}: {} already recorded", board.name, stub.id);
            continue;
        }

        let detail_url = match crawler.detail_url(board, &stub.id) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("{}: cannot build detail URL for {}: {}", board.name, stub.id, e);
                outcome.details_failed += 1;
                continue;
            }
        };

        crawler.pause_between_details().await;
        let step = crawler.fetch_attachments(board, &stub.id).await;
        outcome.details_fetched += 1;
        if !step.is_done() {
            outcome.details_failed += 1;
        }
        let attachments = step.log_skip().unwrap_or_default();

        if known {
            let added = state.merge_attachments(&board.name, &stub.id, &attachments);
            if added > 0 {
                log::info!("{}: {} new attachment(s) on {}", board.name, added, stub.id);
            }
            outcome.attachments_added += added;
            continue;
        }

        let record = PostRecord {
            title: stub.title.clone(),
            detected_at: clock(),
            detail_url,
            attachments,
        };
        log::info!(
            "{}: new post {} | {} ({} attachment(s))",
            board.name,
            stub.id,
            record.title,
            record.attachments.len()
        );
        let post = record.to_post(&stub.id);
        if state.insert_new(&board.name, &stub.id, record) {
            outcome.new_posts.push(post);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, Result};
    use crate::models::{Attachment, Config};
    use crate::utils::http::PageFetcher;

    /// Detail pages keyed by post id, with a request log.
    #[derive(Default)]
    struct DetailPages {
        pages: Mutex<HashMap<String, String>>,
        requests: Mutex<Vec<String>>,
    }

    impl DetailPages {
        fn set(&self, id: &str, body: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(id.to_string(), body.to_string());
        }

        fn requests_for(&self, id: &str) -> usize {
            let needle = format!("ntceStno={id}&");
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.contains(&needle))
                .count()
        }
    }

    #[async_trait]
    impl PageFetcher for DetailPages {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .lock()
                .unwrap()
                .iter()
                .find(|(id, _)| url.contains(&format!("ntceStno={id}&")))
                .map(|(_, body)| body.clone())
                .ok_or_else(|| AppError::fetch(url, "timed out"))
        }
    }

    fn setup() -> (Arc<DetailPages>, BoardCrawler, BoardConfig, Clock) {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        let board = config.boards[0].clone();
        let pages = Arc::new(DetailPages::default());
        let crawler = BoardCrawler::new(Arc::new(config), pages.clone()).unwrap();
        let clock = fixed_clock(DateTime::parse_from_rfc3339("2026-03-02T10:00:00+09:00").unwrap());
        (pages, crawler, board, clock)
    }

    fn stub(id: &str) -> PostStub {
        PostStub {
            id: id.to_string(),
            title: format!("title {id}"),
        }
    }

    fn link(seq: &str, name: &str) -> String {
        format!(r#"<a onclick="gfn_downloadAttFile3nd('{seq}','1')">{name}</a>"#)
    }

    fn names(attachments: &[Attachment]) -> Vec<&str> {
        attachments.iter().map(|a| a.name.as_str()).collect()
    }

    #[tokio::test]
    async fn new_posts_are_recorded_with_clock_time() {
        let (pages, crawler, board, clock) = setup();
        pages.set("P1", &link("S1", "a.pdf"));
        let mut state = State::new();

        let outcome = merge_board(
            &crawler,
            &board,
            &[stub("P1")],
            &mut state,
            MergePolicy::SkipKnown,
            &clock,
        )
        .await;

        assert!(outcome.changed());
        assert_eq!(outcome.new_posts.len(), 1);
        let record = state.get(&board.name, "P1").unwrap();
        assert_eq!(record.title, "title P1");
        assert_eq!(record.detected_at.to_rfc3339(), "2026-03-02T10:00:00+09:00");
        assert_eq!(names(&record.attachments), vec!["a.pdf"]);
        assert!(record.detail_url.contains("ntceStno=P1&"));
    }

    #[tokio::test]
    async fn skip_known_never_refetches() {
        let (pages, crawler, board, clock) = setup();
        pages.set("P1", &link("S1", "a.pdf"));
        let mut state = State::new();
        let stubs = [stub("P1")];

        merge_board(&crawler, &board, &stubs, &mut state, MergePolicy::SkipKnown, &clock).await;
        pages.set("P1", &(link("S1", "a.pdf") + &link("S2", "b.pdf")));
        let second = merge_board(
            &crawler,
            &board,
            &stubs,
            &mut state,
            MergePolicy::SkipKnown,
            &clock,
        )
        .await;

        assert!(!second.changed());
        assert_eq!(second.details_fetched, 0);
        assert_eq!(pages.requests_for("P1"), 1);
        assert_eq!(names(&state.get(&board.name, "P1").unwrap().attachments), vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn refresh_grows_attachments_monotonically() {
        let (pages, crawler, board, clock) = setup();
        pages.set("P1", &(link("S1", "a.pdf") + &link("S2", "b.pdf")));
        let mut state = State::new();
        let stubs = [stub("P1")];
        let policy = MergePolicy::RefreshAttachments;

        merge_board(&crawler, &board, &stubs, &mut state, policy, &clock).await;

        // a.pdf disappears upstream, c.hwp appears
        pages.set("P1", &(link("S2", "b.pdf") + &link("S3", "c.hwp")));
        let second = merge_board(&crawler, &board, &stubs, &mut state, policy, &clock).await;

        assert_eq!(second.attachments_added, 1);
        assert!(second.new_posts.is_empty());
        assert_eq!(pages.requests_for("P1"), 2);
        assert_eq!(
            names(&state.get(&board.name, "P1").unwrap().attachments),
            vec!["a.pdf", "b.pdf", "c.hwp"]
        );

        let third = merge_board(&crawler, &board, &stubs, &mut state, policy, &clock).await;
        assert!(!third.changed());
    }

    #[tokio::test]
    async fn failed_detail_records_post_without_attachments() {
        let (pages, crawler, board, clock) = setup();
        let mut state = State::new();

        let outcome = merge_board(
            &crawler,
            &board,
            &[stub("GONE")],
            &mut state,
            MergePolicy::SkipKnown,
            &clock,
        )
        .await;

        assert_eq!(outcome.details_failed, 1);
        assert_eq!(pages.requests_for("GONE"), 1);
        assert!(state.get(&board.name, "GONE").unwrap().attachments.is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_in_one_walk_fetch_once() {
        let (pages, crawler, board, clock) = setup();
        pages.set("P1", "<p>no files</p>");
        let mut state = State::new();

        let outcome = merge_board(
            &crawler,
            &board,
            &[stub("P1"), stub("P1")],
            &mut state,
            MergePolicy::RefreshAttachments,
            &clock,
        )
        .await;

        assert_eq!(outcome.posts_seen, 1);
        assert_eq!(pages.requests_for("P1"), 1);
    }
}
