//! Request-shaped operations over the indexing pipeline.
//!
//! These mirror the two externally exposed operations: `get_index` (build
//! or reuse an index, optionally ranking it against a query) and
//! `get_detail` (read one page from a built index). All failures come back
//! as structured error responses, never as errors crossing the boundary.

use crate::builder::{IndexBuilder, LogProgress, ProgressSink};
use crate::config::Config;
use crate::detail::{DetailLookup, PageDetail};
use crate::error::IndexError;
use crate::extract::{PageSource, PdfiumExtractor};
use crate::index::SearchResult;
use crate::llm::LanguageModelGateway;
use crate::search::SearchRanker;
use crate::store::IndexStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-page entry of a full-index response.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedPage {
    pub page: usize,
    pub text: String,
    pub summary: String,
}

/// Response of the `get_index` operation.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum IndexResponse {
    /// Full index, returned when no query was given.
    Full {
        status: &'static str,
        file_path: PathBuf,
        total_pages: usize,
        indexed_at: DateTime<Utc>,
        pages: Vec<IndexedPage>,
    },
    /// Ranked results, returned when a query was given.
    Search {
        status: &'static str,
        file_path: PathBuf,
        query: String,
        total_pages: usize,
        results: Vec<SearchResult>,
    },
    Error { error: String },
}

/// Response of the `get_detail` operation.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DetailResponse {
    Found(PageDetail),
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_pages: Option<usize>,
    },
}

/// The indexing service: builder, ranker, and detail lookup over one store.
pub struct PdfIndexService {
    builder: IndexBuilder,
    ranker: SearchRanker,
    lookup: DetailLookup,
}

impl PdfIndexService {
    /// Assemble the service from configuration, using the default PDF
    /// extractor.
    pub fn from_config(config: &Config) -> Self {
        let gateway = Arc::new(LanguageModelGateway::from_config(config));
        let index_dir = config
            .index_dir
            .clone()
            .unwrap_or_else(IndexStore::default_index_dir);

        Self::with_parts(
            Arc::new(PdfiumExtractor),
            gateway,
            IndexStore::new(index_dir),
        )
    }

    /// Assemble the service from explicit parts (tests, custom transports).
    pub fn with_parts(
        source: Arc<dyn PageSource>,
        gateway: Arc<LanguageModelGateway>,
        store: IndexStore,
    ) -> Self {
        Self {
            builder: IndexBuilder::new(source, gateway.clone(), store.clone()),
            ranker: SearchRanker::new(gateway),
            lookup: DetailLookup::new(store),
        }
    }

    /// Build (or reuse) the index for `file_path`. With a query, rank the
    /// indexed pages against it; without, return the full page listing.
    pub async fn get_index(
        &self,
        file_path: &str,
        query: Option<&str>,
        top_k: usize,
    ) -> IndexResponse {
        self.get_index_with_progress(file_path, query, top_k, Arc::new(LogProgress))
            .await
    }

    /// As [`get_index`](Self::get_index) with an explicit progress sink.
    pub async fn get_index_with_progress(
        &self,
        file_path: &str,
        query: Option<&str>,
        top_k: usize,
        progress: Arc<dyn ProgressSink>,
    ) -> IndexResponse {
        let pdf_path = normalize_path(file_path);

        if !pdf_path.exists() {
            return IndexResponse::Error {
                error: format!("File not found: {}", file_path),
            };
        }

        let is_pdf = pdf_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return IndexResponse::Error {
                error: format!("Not a PDF file: {}", file_path),
            };
        }

        let index = match self
            .builder
            .get_or_build_with_progress(&pdf_path, progress)
            .await
        {
            Ok(index) => index,
            Err(e) => {
                return IndexResponse::Error {
                    error: e.to_string(),
                }
            }
        };

        if let Some(query) = query {
            tracing::info!(query, "searching index");
            let results = match self.ranker.rank(&index, query, top_k).await {
                Ok(results) => results,
                Err(e) => {
                    return IndexResponse::Error {
                        error: e.to_string(),
                    }
                }
            };

            return IndexResponse::Search {
                status: "search",
                file_path: index.file_path,
                query: query.to_string(),
                total_pages: index.total_pages,
                results,
            };
        }

        IndexResponse::Full {
            status: "success",
            file_path: index.file_path.clone(),
            total_pages: index.total_pages,
            indexed_at: index.indexed_at,
            pages: index
                .pages
                .iter()
                .map(|p| IndexedPage {
                    page: p.page,
                    text: p.text.clone(),
                    summary: p.summary.clone(),
                })
                .collect(),
        }
    }

    /// Read the stored text and summary of one page. Never builds.
    pub fn get_detail(&self, file_path: &str, page: usize) -> DetailResponse {
        let pdf_path = normalize_path(file_path);

        match self.lookup.get_detail(&pdf_path, page) {
            Ok(detail) => DetailResponse::Found(detail),
            Err(IndexError::IndexNotFound(_)) => DetailResponse::Error {
                error: format!("No index found, run get_index('{}') first", file_path),
                total_pages: None,
            },
            Err(IndexError::PageNotFound { page, total_pages }) => DetailResponse::Error {
                error: format!("Page {} not found", page),
                total_pages: Some(total_pages),
            },
            Err(e) => DetailResponse::Error {
                error: e.to_string(),
                total_pages: None,
            },
        }
    }
}

/// Expand `~` and resolve to an absolute, normalized path.
fn normalize_path(file_path: &str) -> PathBuf {
    let expanded = if let Some(rest) = file_path.strip_prefix("~/") {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(rest))
            .unwrap_or_else(|| PathBuf::from(file_path))
    } else {
        PathBuf::from(file_path)
    };

    expanded.canonicalize().unwrap_or(expanded)
}
