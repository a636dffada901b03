//! Data model for persisted document indexes.
//!
//! A [`DocumentIndex`] holds one [`PageRecord`] per physical page, ordered
//! by page number and contiguous from 1. Records are created once during a
//! build and never mutated; a rebuild replaces the whole index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One indexed page.
///
/// A page that failed processing still occupies its slot, with `error` set
/// and placeholder text/summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-indexed page number.
    pub page: usize,
    /// Extracted (or transcribed) page text, possibly empty.
    pub text: String,
    /// LLM-generated summary of the page.
    pub summary: String,
    /// Set when processing this page failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageRecord {
    /// Create a successfully processed page record.
    pub fn new(page: usize, text: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
            summary: summary.into(),
            error: None,
        }
    }

    /// Create a record for a page whose processing failed.
    pub fn failed(page: usize, error: impl Into<String>) -> Self {
        Self {
            page,
            text: String::new(),
            summary: "processing failed".to_string(),
            error: Some(error.into()),
        }
    }
}

/// A persisted index of one PDF document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIndex {
    /// Absolute, normalized path of the indexed file.
    pub file_path: PathBuf,
    /// SHA-256 hex digest of the file bytes at index time.
    pub file_hash: String,
    /// Total page count of the document.
    pub total_pages: usize,
    /// When the index was built (ISO-8601 on disk).
    pub indexed_at: DateTime<Utc>,
    /// One record per page, ordered by page number ascending.
    pub pages: Vec<PageRecord>,
}

impl DocumentIndex {
    /// Create a new index. `pages` must be ordered and contiguous from 1.
    pub fn new(
        file_path: impl Into<PathBuf>,
        file_hash: impl Into<String>,
        pages: Vec<PageRecord>,
    ) -> Self {
        let total_pages = pages.len();
        Self {
            file_path: file_path.into(),
            file_hash: file_hash.into(),
            total_pages,
            indexed_at: Utc::now(),
            pages,
        }
    }

    /// Get a page record by 1-indexed page number.
    pub fn page(&self, number: usize) -> Option<&PageRecord> {
        if number == 0 || number > self.pages.len() {
            None
        } else {
            Some(&self.pages[number - 1])
        }
    }

    /// Pages that processed cleanly (no error recorded).
    pub fn usable_pages(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.iter().filter(|p| p.error.is_none())
    }
}

/// A single ranked result for a search query. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// 1-indexed page number.
    pub page: usize,
    /// Free-text justification of why this page is relevant.
    pub relevance: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> DocumentIndex {
        let pages = vec![
            PageRecord::new(1, "intro text", "Introduction."),
            PageRecord::failed(2, "extraction failed"),
            PageRecord::new(3, "methods text", "Methods."),
        ];
        DocumentIndex::new("/tmp/doc.pdf", "abc123", pages)
    }

    #[test]
    fn test_page_lookup() {
        let index = sample_index();
        assert!(index.page(0).is_none());
        assert_eq!(index.page(1).unwrap().summary, "Introduction.");
        assert_eq!(index.page(3).unwrap().page, 3);
        assert!(index.page(4).is_none());
    }

    #[test]
    fn test_total_pages_matches_records() {
        let index = sample_index();
        assert_eq!(index.total_pages, index.pages.len());
        for (i, record) in index.pages.iter().enumerate() {
            assert_eq!(record.page, i + 1);
        }
    }

    #[test]
    fn test_usable_pages_excludes_errors() {
        let index = sample_index();
        let usable: Vec<usize> = index.usable_pages().map(|p| p.page).collect();
        assert_eq!(usable, vec![1, 3]);
    }

    #[test]
    fn test_failed_record_placeholders() {
        let record = PageRecord::failed(5, "boom");
        assert_eq!(record.page, 5);
        assert!(record.text.is_empty());
        assert_eq!(record.summary, "processing failed");
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_error_field_omitted_when_none() {
        let record = PageRecord::new(1, "t", "s");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("error"));

        let failed = PageRecord::failed(2, "bad");
        let json = serde_json::to_string(&failed).unwrap();
        assert!(json.contains("\"error\":\"bad\""));
    }

    #[test]
    fn test_index_round_trips_via_json() {
        let index = sample_index();
        let json = serde_json::to_string_pretty(&index).unwrap();
        let loaded: DocumentIndex = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.file_path, index.file_path);
        assert_eq!(loaded.file_hash, index.file_hash);
        assert_eq!(loaded.total_pages, index.total_pages);
        assert_eq!(loaded.indexed_at, index.indexed_at);
        assert_eq!(loaded.pages.len(), index.pages.len());
        assert_eq!(loaded.pages[1].error, index.pages[1].error);
    }
}
