//! Error types for the page indexer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Which language-model channel produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The calling client's own sampling capability.
    Native,
    /// Directly configured HTTP completion endpoint.
    Http,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Native => write!(f, "native"),
            Channel::Http => write!(f, "http"),
        }
    }
}

/// Errors that can occur in the page indexer.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF could not be opened or parsed at all.
    #[error("Cannot read document '{path}': {reason}")]
    DocumentUnreadable { path: PathBuf, reason: String },

    /// A page index outside the document was requested.
    #[error("Page index {page} out of range [0, {total})")]
    PageOutOfRange { page: usize, total: usize },

    /// Neither the native channel nor a configured HTTP endpoint can serve the call.
    #[error("No language model available{}", vision_suffix(.needs_vision))]
    NoLanguageModel { needs_vision: bool },

    /// The language-model backend rejected or failed the call.
    #[error("LLM API error ({channel}): {message}")]
    LlmApi { channel: Channel, message: String },

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No persisted index exists for the document yet.
    #[error("No index found for '{0}', build one first")]
    IndexNotFound(PathBuf),

    /// The requested page is not in the stored index.
    #[error("Page {page} not found (document has {total_pages} pages)")]
    PageNotFound { page: usize, total_pages: usize },
}

fn vision_suffix(needs_vision: &bool) -> &'static str {
    if *needs_vision { " for vision input" } else { "" }
}

impl IndexError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unreadable-document error with path context.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DocumentUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        IndexError::LlmApi {
            channel: Channel::Http,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::LlmParse(err.to_string())
    }
}
