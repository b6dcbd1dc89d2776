//! Local filesystem storage implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::State;
use crate::storage::StateStorage;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    state_path: PathBuf,
    report_path: PathBuf,
}

impl LocalStorage {
    /// Create a storage writing state and report to the given files.
    pub fn new(state_path: impl Into<PathBuf>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            report_path: report_path.into(),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, sync, then rename).
    ///
    /// The temp file is removed if any step fails.
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let result = match Self::write_synced(&tmp, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, path).await.map_err(AppError::Io),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                log::debug!("Could not remove {}: {}", tmp.display(), e);
            }
        }
        result
    }

    async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl StateStorage for LocalStorage {
    async fn load_state(&self) -> Result<State> {
        let bytes = match Self::read_bytes(&self.state_path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!(
                    "No state file at {}, starting empty",
                    self.state_path.display()
                );
                return Ok(State::new());
            }
            Err(e) => {
                log::warn!(
                    "Cannot read state file {}: {}. Starting empty.",
                    self.state_path.display(),
                    e
                );
                return Ok(State::new());
            }
        };

        match serde_json::from_slice::<State>(&bytes) {
            Ok(state) => {
                log::info!(
                    "Loaded state: {} post(s) across {} board(s)",
                    state.post_count(),
                    state.board_count()
                );
                Ok(state)
            }
            Err(e) => {
                log::warn!(
                    "State file {} is malformed ({}). Starting empty.",
                    self.state_path.display(),
                    e
                );
                Ok(State::new())
            }
        }
    }

    async fn save_state(&self, state: &State) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        Self::write_bytes(&self.state_path, &bytes).await?;
        log::info!(
            "State saved: {} post(s) to {}",
            state.post_count(),
            self.state_path.display()
        );
        Ok(())
    }

    async fn write_report(&self, html: &str) -> Result<()> {
        Self::write_bytes(&self.report_path, html.as_bytes()).await
    }

    fn state_location(&self) -> String {
        self.state_path.display().to_string()
    }

    fn report_location(&self) -> String {
        self.report_path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, PostRecord};
    use chrono::DateTime;
    use tempfile::TempDir;

    fn storage(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(tmp.path().join("state.json"), tmp.path().join("report.html"))
    }

    fn sample_state() -> State {
        let mut state = State::new();
        state.insert_new(
            "공지사항",
            "N1",
            PostRecord {
                title: "채용 안내".to_string(),
                detected_at: DateTime::parse_from_rfc3339("2026-02-01T09:30:00+09:00").unwrap(),
                detail_url: "https://example.com/info.do?ntceStno=N1".to_string(),
                attachments: vec![Attachment {
                    name: "공고문.pdf".to_string(),
                    url: "https://example.com/dl?a=1".to_string(),
                }],
            },
        );
        state
    }

    #[tokio::test]
    async fn missing_state_is_empty() {
        let tmp = TempDir::new().unwrap();
        let state = storage(&tmp).load_state().await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn malformed_state_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        std::fs::write(storage.state_path(), "{ not json").unwrap();

        let state = storage.load_state().await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn wrong_shape_state_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        std::fs::write(storage.state_path(), r#"["a", "b"]"#).unwrap();

        assert!(storage.load_state().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips_and_leaves_no_tmp() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let state = sample_state();

        storage.save_state(&state).await.unwrap();
        let loaded = storage.load_state().await.unwrap();

        assert_eq!(loaded, state);
        assert!(!tmp.path().join("state.tmp").exists());

        let text = std::fs::read_to_string(storage.state_path()).unwrap();
        assert!(text.contains("\n  \"공지사항\": {"), "state should be indented: {text}");
    }

    #[tokio::test]
    async fn saving_same_state_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);
        let state = sample_state();

        storage.save_state(&state).await.unwrap();
        let first = std::fs::read(storage.state_path()).unwrap();
        let reloaded = storage.load_state().await.unwrap();
        storage.save_state(&reloaded).await.unwrap();
        let second = std::fs::read(storage.state_path()).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn report_is_overwritten() {
        let tmp = TempDir::new().unwrap();
        let storage = storage(&tmp);

        storage.write_report("<p>one</p>").await.unwrap();
        storage.write_report("<p>two</p>").await.unwrap();

        let html = std::fs::read_to_string(storage.report_path()).unwrap();
        assert_eq!(html, "<p>two</p>");
    }

    #[tokio::test]
    async fn creates_missing_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(
            tmp.path().join("nested/dir/state.json"),
            tmp.path().join("out/report.html"),
        );
        storage.save_state(&sample_state()).await.unwrap();
        assert!(storage.state_path().exists());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_tmp() {
        let tmp = TempDir::new().unwrap();
        let report = tmp.path().join("report.html");
        std::fs::create_dir(&report).unwrap();
        std::fs::write(report.join("keep.txt"), "x").unwrap();
        let storage = LocalStorage::new(tmp.path().join("state.json"), report.clone());

        assert!(storage.write_report("<html></html>").await.is_err());
        assert!(!tmp.path().join("report.tmp").exists());
        assert!(report.join("keep.txt").exists());
    }
}
