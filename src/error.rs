//! Error types for editor operations.

use thiserror::Error;

use crate::model::PageId;

/// Errors surfaced by the editor core.
///
/// Superseded requests are not errors; they are reported as
/// [`LoadOutcome::Stale`](crate::navigator::LoadOutcome) instead.
#[derive(Error, Debug)]
pub enum EditorError {
    /// A page-data or image request did not complete
    #[error("Failed to fetch page {page_id}: {message}")]
    Fetch {
        /// Page the request was made for
        page_id: PageId,
        /// Description of the failure
        message: String,
    },

    /// Page record could not be decoded
    #[error("Invalid page record: {0}")]
    Decode(#[from] serde_json::Error),

    /// Registry lookup by a name that was never registered
    #[error("Unknown panel: {0}")]
    UnknownPanel(String),

    /// A panel with the same name is already registered
    #[error("Duplicate panel: {0}")]
    DuplicatePanel(String),

    /// Persistent storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O error in a file-backed collaborator
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    /// Create a fetch error for a page.
    pub fn fetch(page_id: PageId, message: impl Into<String>) -> Self {
        Self::Fetch {
            page_id,
            message: message.into(),
        }
    }

    /// Whether this error signals a broken editor setup rather than a
    /// user-facing failure.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::UnknownPanel(_) | Self::DuplicatePanel(_))
    }
}
