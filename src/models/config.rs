//! Application configuration structures.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::BoardConfig;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Target site endpoints and markup conventions
    #[serde(default)]
    pub site: SiteConfig,

    /// Output file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// State merge behavior
    #[serde(default)]
    pub merge: MergeConfig,

    /// HTML report settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Board registry, processed in order
    #[serde(default = "defaults::default_boards")]
    pub boards: Vec<BoardConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.list_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.list_timeout_secs must be > 0",
            ));
        }
        if self.crawler.detail_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.detail_timeout_secs must be > 0",
            ));
        }
        if self.crawler.max_pages == Some(0) {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        url::Url::parse(&self.site.base_url)
            .map_err(|e| AppError::validation(format!("site.base_url is invalid: {e}")))?;
        regex::Regex::new(&self.site.pagination_pattern).map_err(|e| {
            AppError::validation(format!("site.pagination_pattern is invalid: {e}"))
        })?;
        scraper::Selector::parse(&self.site.pagination_selector).map_err(|e| {
            AppError::validation(format!("site.pagination_selector is invalid: {e:?}"))
        })?;
        if self.site.download_fn.trim().is_empty() {
            return Err(AppError::validation("site.download_fn is empty"));
        }
        if self.boards.is_empty() {
            return Err(AppError::validation("No boards defined"));
        }

        let mut names = HashSet::new();
        for board in &self.boards {
            board.validate()?;
            if !names.insert(board.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate board name: {}",
                    board.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a board by name.
    pub fn board(&self, name: &str) -> Option<&BoardConfig> {
        self.boards.iter().find(|b| b.name == name)
    }

    /// Select boards by name, keeping registry order.
    ///
    /// An empty selection means every board.
    pub fn select_boards(&self, names: &[String]) -> Result<Vec<BoardConfig>> {
        if names.is_empty() {
            return Ok(self.boards.clone());
        }
        if let Some(unknown) = names.iter().find(|n| self.board(n).is_none()) {
            return Err(AppError::config(format!("Unknown board: {unknown}")));
        }
        Ok(self
            .boards
            .iter()
            .filter(|b| names.contains(&b.name))
            .cloned()
            .collect())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            site: SiteConfig::default(),
            paths: PathsConfig::default(),
            merge: MergeConfig::default(),
            report: ReportConfig::default(),
            boards: defaults::default_boards(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Timeout for listing page requests in seconds
    #[serde(default = "defaults::list_timeout")]
    pub list_timeout_secs: u64,

    /// Timeout for detail page requests in seconds
    #[serde(default = "defaults::detail_timeout")]
    pub detail_timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Upper bound on listing pages walked per board
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            list_timeout_secs: defaults::list_timeout(),
            detail_timeout_secs: defaults::detail_timeout(),
            request_delay_ms: defaults::request_delay(),
            max_pages: None,
        }
    }
}

/// Site-wide endpoints and client-side function conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host every path is joined to
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Attachment download endpoint path
    #[serde(default = "defaults::download_path")]
    pub download_path: String,

    /// Client-side function invoked by attachment links
    #[serde(default = "defaults::download_fn")]
    pub download_fn: String,

    /// Regex for page-jump calls; capture group 1 is the page number
    #[serde(default = "defaults::pagination_pattern")]
    pub pagination_pattern: String,

    /// CSS selector for the block holding pagination links
    #[serde(default = "defaults::pagination_selector")]
    pub pagination_selector: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            download_path: defaults::download_path(),
            download_fn: defaults::download_fn(),
            pagination_pattern: defaults::pagination_pattern(),
            pagination_selector: defaults::pagination_selector(),
        }
    }
}

/// Output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::state_file")]
    pub state_file: String,

    #[serde(default = "defaults::report_file")]
    pub report_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: defaults::state_file(),
            report_file: defaults::report_file(),
        }
    }
}

/// How posts already present in state are treated on later runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Known post ids are never fetched again.
    #[default]
    SkipKnown,
    /// Every post is fetched each run and new attachments are merged in.
    RefreshAttachments,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::SkipKnown => write!(f, "skip-known"),
            MergePolicy::RefreshAttachments => write!(f, "refresh-attachments"),
        }
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "skip-known" => Ok(MergePolicy::SkipKnown),
            "refresh-attachments" => Ok(MergePolicy::RefreshAttachments),
            other => Err(format!(
                "unknown policy '{other}' (expected skip-known or refresh-attachments)"
            )),
        }
    }
}

/// State merge settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub policy: MergePolicy,

    /// Persist state after every board that changed it
    #[serde(default)]
    pub save_per_board: bool,
}

/// Which posts the HTML report lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportScope {
    /// Only posts first seen in this run
    New,
    /// Everything recorded in state
    #[default]
    All,
}

impl FromStr for ReportScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "new" => Ok(ReportScope::New),
            "all" => Ok(ReportScope::All),
            other => Err(format!("unknown scope '{other}' (expected new or all)")),
        }
    }
}

/// HTML report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "defaults::report_title")]
    pub title: String,

    #[serde(default)]
    pub scope: ReportScope,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: defaults::report_title(),
            scope: ReportScope::default(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    use crate::models::BoardConfig;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0".into()
    }
    pub fn list_timeout() -> u64 {
        20
    }
    pub fn detail_timeout() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        500
    }

    // Site defaults
    pub fn base_url() -> String {
        "https://www.work24.go.kr".into()
    }
    pub fn download_path() -> String {
        "/cm/common/fileDownload3nd.do".into()
    }
    pub fn download_fn() -> String {
        "gfn_downloadAttFile3nd".into()
    }
    pub fn pagination_pattern() -> String {
        r#"(?i)\w*page\w*\(\s*['"]?(\d+)['"]?\s*\)"#.into()
    }
    pub fn pagination_selector() -> String {
        r#"[class*="paging"], [class*="pagination"]"#.into()
    }

    // Path defaults
    pub fn state_file() -> String {
        "work24_state.json".into()
    }
    pub fn report_file() -> String {
        "work24_notice.html".into()
    }

    pub fn report_title() -> String {
        "Work24 공지사항".into()
    }

    // Board registry defaults
    pub fn default_boards() -> Vec<BoardConfig> {
        let pairs = |items: &[(&str, &str)]| -> BTreeMap<String, String> {
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        let query = pairs(&[("bbsClCd", "kf9cT1sUygs8E64dnqWAxg==")]);
        let detail_query = pairs(&[
            ("currentPageNo", "1"),
            ("recordCountPerPage", "10"),
            ("sortTycd", "1"),
            ("startDt", ""),
            ("endDt", ""),
            ("searchDeTpCd", "termSearchGbn0"),
            ("searchTxt", ""),
            ("searchTycd", "3"),
            ("upprJobClCd", ""),
            ("jobClCd", ""),
            ("bbsUrl", "/c/a/0100/selectBbttListPost.do"),
        ]);

        vec![BoardConfig {
            name: "공지사항".to_string(),
            list_path: "/cm/c/a/0100/selectBbttList.do".to_string(),
            detail_path: "/cm/c/a/0100/selectBbttInfo.do".to_string(),
            detail_id_param: "ntceStno".to_string(),
            detail_fn: "fn_DetailInfo".to_string(),
            page_param: "currentPageNo".to_string(),
            page_size_param: "recordCountPerPage".to_string(),
            page_size: 10,
            query,
            detail_query,
        }]
    }
}
