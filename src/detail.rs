//! Read-only lookup of a single page from a persisted index.

use crate::error::{IndexError, Result};
use crate::store::IndexStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Stored content of one page, as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct PageDetail {
    pub file_path: PathBuf,
    pub page: usize,
    pub text: String,
    pub summary: String,
    pub indexed_at: DateTime<Utc>,
}

/// Reads previously built indexes. Never triggers a build.
pub struct DetailLookup {
    store: IndexStore,
}

impl DetailLookup {
    pub fn new(store: IndexStore) -> Self {
        Self { store }
    }

    /// Get the stored text and summary for one page (1-indexed).
    pub fn get_detail(&self, path: &Path, page: usize) -> Result<PageDetail> {
        let index = self
            .store
            .load(path)?
            .ok_or_else(|| IndexError::IndexNotFound(path.to_path_buf()))?;

        let record = index.page(page).ok_or(IndexError::PageNotFound {
            page,
            total_pages: index.total_pages,
        })?;

        tracing::debug!(path = %path.display(), page, "page detail lookup");

        Ok(PageDetail {
            file_path: index.file_path.clone(),
            page: record.page,
            text: record.text.clone(),
            summary: record.summary.clone(),
            indexed_at: index.indexed_at,
        })
    }
}
