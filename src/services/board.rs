// src/services/board.rs

//! Board crawler service.
//!
//! Walks a board's paginated listing and fetches attachment lists from
//! detail pages. Requests are made one at a time with a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{Attachment, BoardConfig, Config, PostStub, Step};
use crate::services::extract::{DetailLinkRule, DownloadLinkRule, PaginationRule};
use crate::utils::http::{PageFetcher, build_url};

/// Posts collected from one board's listing pages.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub posts: Vec<PostStub>,
    pub last_page: u32,
    pub pages_total: usize,
    pub pages_failed: usize,
}

/// Service for walking boards and fetching post details.
pub struct BoardCrawler {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    pagination: PaginationRule,
    downloads: DownloadLinkRule,
}

impl BoardCrawler {
    /// Create a crawler, compiling the site-wide extraction rules.
    pub fn new(config: Arc<Config>, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let pagination = PaginationRule::new(
            &config.site.pagination_pattern,
            &config.site.pagination_selector,
        )?;
        let downloads = DownloadLinkRule::new(
            &config.site.download_fn,
            &config.site.base_url,
            &config.site.download_path,
        )?;

        Ok(Self {
            config,
            fetcher,
            pagination,
            downloads,
        })
    }

    /// URL of a listing page.
    pub fn list_url(&self, board: &BoardConfig, page: u32) -> Result<String> {
        let url = build_url(
            &self.config.site.base_url,
            &board.list_path,
            &board.list_params(page),
        )?;
        Ok(url.to_string())
    }

    /// URL of a post's detail page.
    pub fn detail_url(&self, board: &BoardConfig, id: &str) -> Result<String> {
        let url = build_url(
            &self.config.site.base_url,
            &board.detail_path,
            &board.detail_params(id),
        )?;
        Ok(url.to_string())
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.config.crawler.request_delay_ms)
    }

    async fn pause(&self) {
        let delay = self.delay();
        if delay.as_millis() > 0 {
            tokio::time::sleep(delay).await;
        }
    }

    async fn fetch_list_page(&self, board: &BoardConfig, page: u32) -> Step<String> {
        let context = format!("{} page {}", board.name, page);
        let result = match self.list_url(board, page) {
            Ok(url) => {
                log::debug!("GET {}", url);
                let timeout = Duration::from_secs(self.config.crawler.list_timeout_secs);
                self.fetcher.fetch(&url, timeout).await
            }
            Err(e) => Err(e),
        };
        Step::from_result(context, result)
    }

    /// Walk every listing page of a board.
    ///
    /// Page 1 determines the last page. Pages that fail to load are skipped.
    pub async fn walk(&self, board: &BoardConfig) -> Result<WalkOutcome> {
        let rule = DetailLinkRule::new(&board.detail_fn)?;
        let mut outcome = WalkOutcome {
            last_page: 1,
            pages_total: 1,
            ..WalkOutcome::default()
        };

        match self.fetch_list_page(board, 1).await.log_skip() {
            Some(html) => {
                outcome.last_page = self.pagination.last_page(&html);
                outcome.posts.extend(rule.extract_posts(&html));
            }
            None => {
                outcome.pages_failed += 1;
                return Ok(outcome);
            }
        }

        if let Some(cap) = self.config.crawler.max_pages {
            if outcome.last_page > cap {
                log::info!(
                    "{}: limiting walk to {} of {} pages",
                    board.name,
                    cap,
                    outcome.last_page
                );
                outcome.last_page = cap;
            }
        }

        log::info!(
            "{}: {} page(s), {} post(s) on page 1",
            board.name,
            outcome.last_page,
            outcome.posts.len()
        );

        for page in 2..=outcome.last_page {
            self.pause().await;
            outcome.pages_total += 1;

            match self.fetch_list_page(board, page).await.log_skip() {
                Some(html) => {
                    let posts = rule.extract_posts(&html);
                    log::debug!("{}: page {} has {} post(s)", board.name, page, posts.len());
                    outcome.posts.extend(posts);
                }
                None => outcome.pages_failed += 1,
            }
        }

        Ok(outcome)
    }

    /// Fetch a post's detail page and extract its attachments.
    pub async fn fetch_attachments(&self, board: &BoardConfig, id: &str) -> Step<Vec<Attachment>> {
        let context = format!("{} post {}", board.name, id);
        let result = match self.detail_url(board, id) {
            Ok(url) => {
                log::debug!("GET {}", url);
                let timeout = Duration::from_secs(self.config.crawler.detail_timeout_secs);
                self.fetcher
                    .fetch(&url, timeout)
                    .await
                    .map(|html| self.downloads.extract_attachments(&html))
            }
            Err(e) => Err(e),
        };
        Step::from_result(context, result)
    }

    /// Sleep for the configured delay between detail requests.
    pub async fn pause_between_details(&self) {
        self.pause().await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;

    /// Serves canned pages keyed by URL substring.
    struct FakeFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .iter()
                .find(|(key, _)| url.contains(key.as_str()))
                .map(|(_, body)| body.clone())
                .ok_or_else(|| AppError::fetch(url, "connection refused"))
        }
    }

    fn config() -> Arc<Config> {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        Arc::new(config)
    }

    fn crawler(fetcher: Arc<FakeFetcher>) -> BoardCrawler {
        BoardCrawler::new(config(), fetcher).unwrap()
    }

    const PAGE_1: &str = r#"
        <a href="javascript:fn_DetailInfo('A1')">첫 글</a>
        <a href="javascript:fn_DetailInfo('A2')">둘째 글</a>
        <a href="javascript:fn_Page('3')" class="last">끝</a>"#;
    const PAGE_3: &str = r#"<a href="javascript:fn_DetailInfo('C1')">셋째 쪽</a>"#;

    #[test]
    fn list_url_carries_pagination_and_board_params() {
        let c = crawler(Arc::new(FakeFetcher::new(&[])));
        let board = &c.config.boards[0];
        let url = c.list_url(board, 2).unwrap();
        assert!(url.starts_with("https://www.work24.go.kr/cm/c/a/0100/selectBbttList.do?"));
        assert!(url.contains("currentPageNo=2"));
        assert!(url.contains("recordCountPerPage=10"));
        assert!(url.contains("bbsClCd=kf9cT1sUygs8E64dnqWAxg%3D%3D"));
    }

    #[test]
    fn detail_url_substitutes_id() {
        let c = crawler(Arc::new(FakeFetcher::new(&[])));
        let board = &c.config.boards[0];
        let url = c.detail_url(board, "N123").unwrap();
        assert!(url.starts_with(
            "https://www.work24.go.kr/cm/c/a/0100/selectBbttInfo.do?ntceStno=N123&"
        ));
    }

    #[tokio::test]
    async fn walk_skips_failed_pages() {
        // page 2 is missing from the fake and fails
        let fetcher = Arc::new(FakeFetcher::new(&[
            ("currentPageNo=1&", PAGE_1),
            ("currentPageNo=3&", PAGE_3),
        ]));
        let c = crawler(Arc::clone(&fetcher));
        let board = c.config.boards[0].clone();

        let outcome = c.walk(&board).await.unwrap();
        let ids: Vec<_> = outcome.posts.iter().map(|p| p.id.as_str()).collect();

        assert_eq!(outcome.last_page, 3);
        assert_eq!(outcome.pages_total, 3);
        assert_eq!(outcome.pages_failed, 1);
        assert_eq!(ids, vec!["A1", "A2", "C1"]);

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].contains("currentPageNo=3&"));
    }

    #[tokio::test]
    async fn walk_respects_max_pages() {
        let fetcher = Arc::new(FakeFetcher::new(&[("currentPageNo=1&", PAGE_1)]));
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        config.crawler.max_pages = Some(1);
        let c = BoardCrawler::new(Arc::new(config), fetcher.clone()).unwrap();
        let board = c.config.boards[0].clone();

        let outcome = c.walk(&board).await.unwrap();
        assert_eq!(outcome.last_page, 1);
        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_first_page_yields_nothing() {
        let c = crawler(Arc::new(FakeFetcher::new(&[])));
        let board = c.config.boards[0].clone();

        let outcome = c.walk(&board).await.unwrap();
        assert!(outcome.posts.is_empty());
        assert_eq!(outcome.last_page, 1);
        assert_eq!(outcome.pages_failed, 1);
    }

    #[tokio::test]
    async fn attachments_from_detail_page() {
        let detail = r#"<a onclick="gfn_downloadAttFile3nd('ABC','123')">file.pdf</a>"#;
        let c = crawler(Arc::new(FakeFetcher::new(&[("ntceStno=N1&", detail)])));
        let board = c.config.boards[0].clone();

        let files = c.fetch_attachments(&board, "N1").await.into_option().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "file.pdf");
        assert!(files[0]
            .url
            .ends_with("/fileDownload3nd.do?encAthflSeq=ABC&atchFsno=123"));
    }

    #[tokio::test]
    async fn detail_failure_is_a_skip() {
        let c = crawler(Arc::new(FakeFetcher::new(&[])));
        let board = c.config.boards[0].clone();

        let step = c.fetch_attachments(&board, "N1").await;
        assert!(!step.is_done());
        assert!(step.unwrap_or_default().is_empty());
    }
}
