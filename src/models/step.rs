//! Best-effort step results.

use std::fmt;

/// Outcome of a network + parse step that is allowed to fail softly.
///
/// Callers log a `Skipped` step and continue with whatever data they have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Done(T),
    Skipped { context: String, reason: String },
}

impl<T> Step<T> {
    /// Wrap a fallible result, keeping the error text as the skip reason.
    pub fn from_result<E: fmt::Display>(
        context: impl Into<String>,
        result: std::result::Result<T, E>,
    ) -> Self {
        match result {
            Ok(value) => Step::Done(value),
            Err(e) => Step::Skipped {
                context: context.into(),
                reason: e.to_string(),
            },
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Step::Done(value) => Some(value),
            Step::Skipped { .. } => None,
        }
    }

    /// Log a skip as a warning and hand back the value, if any.
    pub fn log_skip(self) -> Option<T> {
        if let Step::Skipped { context, reason } = &self {
            log::warn!("Skipped {}: {}", context, reason);
        }
        self.into_option()
    }
}

impl<T: Default> Step<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}
