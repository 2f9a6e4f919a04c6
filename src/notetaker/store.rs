//! Persistence boundary: upsert of a single named document.

use std::fmt;

use async_trait::async_trait;

/// File name of the persisted transcript.
pub const NOTES_FILENAME: &str = "Notes.md";

/// A document to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub description: String,
    pub content: String,
    pub public: bool,
}

/// Reference to a persisted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: String,
    pub url: String,
}

#[derive(Debug)]
pub enum StoreError {
    Http(String),
    Api(String),
    Parse(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Api(e) => write!(f, "API error: {e}"),
            Self::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Create `document` when `existing` is `None`, otherwise replace the content of the
    /// existing artifact in place. Returns the (possibly refreshed) artifact reference.
    async fn upsert(
        &self,
        existing: Option<&Artifact>,
        document: &Document,
    ) -> Result<Artifact, StoreError>;
}
