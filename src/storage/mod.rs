//! Storage abstractions for crawl state and reports.
//!
//! ```text
//! {workdir}/
//! ├── work24_state.json   # board → post id → record
//! └── work24_notice.html  # report, overwritten every run
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::State;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for state and report storage backends.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load persisted state. Missing or unreadable state is empty.
    async fn load_state(&self) -> Result<State>;

    /// Persist state, replacing the previous copy atomically.
    async fn save_state(&self, state: &State) -> Result<()>;

    /// Write the rendered HTML report.
    async fn write_report(&self, html: &str) -> Result<()>;

    /// Human-readable location of the state, for logs.
    fn state_location(&self) -> String;

    /// Human-readable location of the report, for logs.
    fn report_location(&self) -> String;
}
