//! Board registry entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Configuration for a single bulletin board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardConfig {
    /// Board display name, unique within the registry and used as the state key
    pub name: String,

    /// Listing page path (e.g. "/cm/c/a/0100/selectBbttList.do")
    pub list_path: String,

    /// Detail page path
    pub detail_path: String,

    /// Query parameter carrying the post identifier on the detail page
    pub detail_id_param: String,

    /// Client-side function invoked by post links on the listing page
    #[serde(default = "default_detail_fn")]
    pub detail_fn: String,

    #[serde(default = "default_page_param")]
    pub page_param: String,

    #[serde(default = "default_page_size_param")]
    pub page_size_param: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Board-specific filter parameters sent with list and detail requests
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// Extra parameters sent only with detail requests
    #[serde(default)]
    pub detail_query: BTreeMap<String, String>,
}

fn default_detail_fn() -> String {
    "fn_DetailInfo".to_string()
}

fn default_page_param() -> String {
    "currentPageNo".to_string()
}

fn default_page_size_param() -> String {
    "recordCountPerPage".to_string()
}

fn default_page_size() -> u32 {
    10
}

impl BoardConfig {
    /// Query pairs for a listing page request.
    pub fn list_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params = vec![
            (self.page_param.clone(), page.to_string()),
            (self.page_size_param.clone(), self.page_size.to_string()),
        ];
        params.extend(self.query.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }

    /// Query pairs for a detail page request.
    pub fn detail_params(&self, id: &str) -> Vec<(String, String)> {
        let mut params = vec![(self.detail_id_param.clone(), id.to_string())];
        params.extend(self.query.iter().map(|(k, v)| (k.clone(), v.clone())));
        params.extend(
            self.detail_query
                .iter()
                .filter(|(k, _)| !self.query.contains_key(*k))
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        params
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("list_path", &self.list_path),
            ("detail_path", &self.detail_path),
            ("detail_id_param", &self.detail_id_param),
            ("detail_fn", &self.detail_fn),
            ("page_param", &self.page_param),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "board '{}': {field} is empty",
                    self.name
                )));
            }
        }
        if self.page_size == 0 {
            return Err(AppError::validation(format!(
                "board '{}': page_size must be > 0",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardConfig {
        BoardConfig {
            name: "notice".to_string(),
            list_path: "/list.do".to_string(),
            detail_path: "/info.do".to_string(),
            detail_id_param: "ntceStno".to_string(),
            detail_fn: default_detail_fn(),
            page_param: default_page_param(),
            page_size_param: default_page_size_param(),
            page_size: 10,
            query: BTreeMap::from([("bbsClCd".to_string(), "X".to_string())]),
            detail_query: BTreeMap::from([("bbsUrl".to_string(), "/post.do".to_string())]),
        }
    }

    #[test]
    fn list_params_lead_with_pagination() {
        let params = board().list_params(3);
        assert_eq!(params[0], ("currentPageNo".to_string(), "3".to_string()));
        assert_eq!(params[1], ("recordCountPerPage".to_string(), "10".to_string()));
        assert_eq!(params[2], ("bbsClCd".to_string(), "X".to_string()));
    }

    #[test]
    fn detail_params_lead_with_id() {
        let params = board().detail_params("N-1");
        assert_eq!(params[0], ("ntceStno".to_string(), "N-1".to_string()));
        assert!(params.contains(&("bbsUrl".to_string(), "/post.do".to_string())));
        assert!(params.contains(&("bbsClCd".to_string(), "X".to_string())));
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut b = board();
        b.page_size = 0;
        assert!(b.validate().is_err());
    }
}
