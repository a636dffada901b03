//! Index building with per-document build coordination.
//!
//! [`IndexBuilder`] owns the full pipeline: cache lookup, per-page
//! extraction, LLM summarization (with vision OCR fallback for pages
//! without extractable text), and persistence. [`BuildCoordinator`]
//! guarantees at most one build per document path is in flight; concurrent
//! callers for the same path wait and then reuse the finished index.

use crate::error::{IndexError, Result};
use crate::extract::PageSource;
use crate::index::{DocumentIndex, PageRecord};
use crate::llm::{
    parse_ocr_response, LanguageModelGateway, OcrOutcome, PromptPart, Prompts,
};
use crate::store::{content_hash, IndexStore};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Maximum characters of extracted text sent to the summarizer per page.
const MAX_SUMMARY_INPUT_CHARS: usize = 3000;

/// Receiver for monotonic build progress.
///
/// `total` is fixed for the whole build; `done` advances by exactly one per
/// processed page, success and per-page failure alike.
pub trait ProgressSink: Send + Sync {
    fn report(&self, done: usize, total: usize);
}

/// Progress sink that discards all reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _done: usize, _total: usize) {}
}

/// Progress sink that logs each step at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, done: usize, total: usize) {
        tracing::debug!(done, total, "indexing progress");
    }
}

/// Per-document-path build locks.
///
/// Entries are created lazily on first request for a path and retained for
/// the process lifetime; the map holds only an `Arc<Mutex<()>>` per path.
#[derive(Default)]
pub struct BuildCoordinator {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl BuildCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or lazily create) the build lock for a document path.
    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("build lock map poisoned");
        locks.entry(path.to_path_buf()).or_default().clone()
    }
}

/// Orchestrates cache lookup, page processing, and persistence.
pub struct IndexBuilder {
    source: Arc<dyn PageSource>,
    gateway: Arc<LanguageModelGateway>,
    store: IndexStore,
    coordinator: Arc<BuildCoordinator>,
}

impl IndexBuilder {
    /// Create a new builder with its own coordinator.
    pub fn new(
        source: Arc<dyn PageSource>,
        gateway: Arc<LanguageModelGateway>,
        store: IndexStore,
    ) -> Self {
        Self::with_coordinator(source, gateway, store, Arc::new(BuildCoordinator::new()))
    }

    /// Create a builder sharing an existing coordinator. Builders over the
    /// same store must share one coordinator for the single-build-per-path
    /// guarantee to hold across them.
    pub fn with_coordinator(
        source: Arc<dyn PageSource>,
        gateway: Arc<LanguageModelGateway>,
        store: IndexStore,
        coordinator: Arc<BuildCoordinator>,
    ) -> Self {
        Self {
            source,
            gateway,
            store,
            coordinator,
        }
    }

    /// Return the cached index for `path`, building it first if missing or
    /// stale. `path` must be absolute and normalized.
    pub async fn get_or_build(&self, path: &Path) -> Result<DocumentIndex> {
        self.get_or_build_with_progress(path, Arc::new(NoProgress))
            .await
    }

    /// As [`get_or_build`](Self::get_or_build), reporting per-page progress.
    pub async fn get_or_build_with_progress(
        &self,
        path: &Path,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DocumentIndex> {
        let current_hash = content_hash(path)?;

        // Fast path: a fresh index needs no lock beyond the read.
        if let Some(cached) = self.store.load(path)? {
            if !IndexStore::is_stale(&cached, &current_hash) {
                tracing::info!(path = %path.display(), "using cached index");
                return Ok(cached);
            }
        }

        let lock = self.coordinator.lock_for(path);
        // The guard is dropped on every exit path, including task
        // cancellation, so a waiter can always proceed.
        let _guard = lock.lock().await;

        // Re-check under the lock: another waiter may have just finished
        // this exact build while we queued for the lock.
        if let Some(cached) = self.store.load(path)? {
            if !IndexStore::is_stale(&cached, &current_hash) {
                tracing::info!(path = %path.display(), "using cached index");
                return Ok(cached);
            }
        }

        self.build(path, &current_hash, progress.as_ref()).await
    }

    /// Run a full build and persist the result.
    async fn build(
        &self,
        path: &Path,
        current_hash: &str,
        progress: &dyn ProgressSink,
    ) -> Result<DocumentIndex> {
        // Summarization needs some channel; failing here keeps a dead
        // endpoint from persisting an index full of error records.
        if !self.gateway.has_any_channel() {
            return Err(IndexError::NoLanguageModel { needs_vision: false });
        }

        tracing::info!(path = %path.display(), "indexing document");

        let total_pages = self.source.page_count(path)?;
        progress.report(0, total_pages);

        let mut pages = Vec::with_capacity(total_pages);
        for page_index in 0..total_pages {
            let page_number = page_index + 1;

            let record = match self.process_page(path, page_index).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(page = page_number, error = %e, "page processing failed");
                    PageRecord::failed(page_number, e.to_string())
                }
            };

            pages.push(record);
            progress.report(page_number, total_pages);
        }

        let index = DocumentIndex::new(path, current_hash, pages);
        self.store.save(&index)?;

        tracing::info!(path = %path.display(), total_pages, "index complete");
        Ok(index)
    }

    /// Process one page: extract, then summarize through the first usable
    /// tier (text summarization, vision OCR, blank-page placeholder).
    async fn process_page(&self, path: &Path, page_index: usize) -> Result<PageRecord> {
        let page_number = page_index + 1;
        let extracted = self.source.extract_page(path, page_index)?;

        if !extracted.text.trim().is_empty() {
            let summary = self.summarize_text(&extracted.text, page_number).await?;
            return Ok(PageRecord::new(page_number, extracted.text, summary));
        }

        // No extractable text: OCR the rendered page if a vision channel exists.
        if let Some(image) = extracted.image_png {
            if self.gateway.supports_vision() {
                return self.ocr_page(image, page_number).await;
            }
        }

        Ok(PageRecord::new(page_number, "", "blank page"))
    }

    async fn summarize_text(&self, text: &str, page_number: usize) -> Result<String> {
        let prompt = Prompts::summarize_page()
            .replace("{page}", &page_number.to_string())
            .replace("{content}", truncate_chars(text, MAX_SUMMARY_INPUT_CHARS));

        let response = self
            .gateway
            .complete(
                Some(Prompts::system_document_analyzer()),
                &[PromptPart::Text(prompt)],
            )
            .await?;

        Ok(response.trim().to_string())
    }

    async fn ocr_page(&self, image: Vec<u8>, page_number: usize) -> Result<PageRecord> {
        let prompt = Prompts::ocr_page().replace("{page}", &page_number.to_string());

        let response = self
            .gateway
            .complete(
                Some(Prompts::system_document_analyzer()),
                &[PromptPart::Text(prompt), PromptPart::ImagePng(image)],
            )
            .await?;

        let record = match parse_ocr_response(&response) {
            OcrOutcome::Structured { text, summary } => {
                PageRecord::new(page_number, text, summary)
            }
            OcrOutcome::Degraded { raw } => {
                tracing::warn!(page = page_number, "OCR response did not parse, storing raw text");
                PageRecord::new(page_number, raw, "parse failed")
            }
        };

        Ok(record)
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedPage;
    use crate::llm::NativeSampler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Fake page source: serves canned pages, counts extraction calls,
    /// optionally fails specific pages.
    struct FakeSource {
        pages: Vec<ExtractedPage>,
        failing_pages: Vec<usize>,
        extract_calls: AtomicUsize,
    }

    impl FakeSource {
        fn with_texts(texts: &[&str]) -> Self {
            Self {
                pages: texts
                    .iter()
                    .map(|t| ExtractedPage {
                        text: t.to_string(),
                        image_png: None,
                    })
                    .collect(),
                failing_pages: Vec::new(),
                extract_calls: AtomicUsize::new(0),
            }
        }
    }

    impl PageSource for FakeSource {
        fn page_count(&self, _path: &Path) -> Result<usize> {
            Ok(self.pages.len())
        }

        fn extract_page(&self, _path: &Path, page_index: usize) -> Result<ExtractedPage> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_pages.contains(&page_index) {
                return Err(IndexError::unreadable("/fake", "extraction exploded"));
            }
            Ok(self.pages[page_index].clone())
        }
    }

    /// Fake native sampler: canned reply, call counter.
    struct FakeSampler {
        reply: String,
        vision: bool,
        calls: AtomicUsize,
    }

    impl FakeSampler {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                vision: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn with_vision(reply: &str) -> Self {
            Self {
                vision: true,
                ..Self::new(reply)
            }
        }
    }

    #[async_trait]
    impl NativeSampler for FakeSampler {
        async fn sample(&self, _parts: &[PromptPart]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        fn supports_vision(&self) -> bool {
            self.vision
        }
    }

    struct Fixture {
        _dirs: (TempDir, TempDir),
        pdf_path: PathBuf,
        sampler: Arc<FakeSampler>,
        builder: Arc<IndexBuilder>,
    }

    fn fixture(source: FakeSource, sampler: FakeSampler) -> Fixture {
        let doc_dir = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();

        let pdf_path = doc_dir.path().join("doc.pdf");
        std::fs::write(&pdf_path, b"pdf bytes v1").unwrap();

        let sampler = Arc::new(sampler);
        let gateway = LanguageModelGateway::from_config(&crate::config::Config::default())
            .with_native(sampler.clone());

        let builder = Arc::new(IndexBuilder::new(
            Arc::new(source),
            Arc::new(gateway),
            IndexStore::new(index_dir.path()),
        ));

        Fixture {
            _dirs: (doc_dir, index_dir),
            pdf_path,
            sampler,
            builder,
        }
    }

    #[tokio::test]
    async fn test_full_build() {
        let fx = fixture(
            FakeSource::with_texts(&["intro", "methods", "results"]),
            FakeSampler::new("a summary"),
        );

        let index = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();

        assert_eq!(index.total_pages, 3);
        assert_eq!(index.pages.len(), 3);
        for (i, record) in index.pages.iter().enumerate() {
            assert_eq!(record.page, i + 1);
            assert_eq!(record.summary, "a summary");
            assert!(record.error.is_none());
        }
        assert_eq!(index.pages[1].text, "methods");
    }

    #[tokio::test]
    async fn test_build_persists_index() {
        let fx = fixture(
            FakeSource::with_texts(&["only page"]),
            FakeSampler::new("s"),
        );

        let built = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();
        let stored = fx.builder.store.load(&fx.pdf_path).unwrap().unwrap();

        assert_eq!(stored.file_hash, built.file_hash);
        assert_eq!(stored.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_model() {
        let fx = fixture(
            FakeSource::with_texts(&["one", "two"]),
            FakeSampler::new("s"),
        );

        let first = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();
        assert_eq!(fx.sampler.calls.load(Ordering::SeqCst), 2);

        let second = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();
        // Unchanged file: no second model invocation, identical pages.
        assert_eq!(fx.sampler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.indexed_at, first.indexed_at);
        assert_eq!(second.pages.len(), first.pages.len());
        for (a, b) in first.pages.iter().zip(second.pages.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.summary, b.summary);
        }
    }

    #[tokio::test]
    async fn test_hash_change_rebuilds() {
        let fx = fixture(
            FakeSource::with_texts(&["one"]),
            FakeSampler::new("s"),
        );

        let first = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        std::fs::write(&fx.pdf_path, b"pdf bytes v2").unwrap();

        let second = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();

        assert_ne!(second.file_hash, first.file_hash);
        assert!(second.indexed_at > first.indexed_at);
        assert_eq!(fx.sampler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_containment() {
        let mut source = FakeSource::with_texts(&["a", "b", "c", "d", "e"]);
        source.failing_pages = vec![2]; // 0-based: page 3 fails

        let fx = fixture(source, FakeSampler::new("s"));
        let index = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();

        assert_eq!(index.pages.len(), 5);
        assert!(index.pages[2].error.is_some());
        assert!(index.pages[2].text.is_empty());
        for i in [0, 1, 3, 4] {
            assert!(index.pages[i].error.is_none());
            assert_eq!(index.pages[i].summary, "s");
        }
    }

    #[tokio::test]
    async fn test_concurrent_builds_run_once() {
        let fx = fixture(
            FakeSource::with_texts(&["one", "two", "three"]),
            FakeSampler::new("s"),
        );

        let mut handles = Vec::new();
        for _ in 0..5 {
            let builder = fx.builder.clone();
            let path = fx.pdf_path.clone();
            handles.push(tokio::spawn(async move {
                builder.get_or_build(&path).await.unwrap()
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        // Exactly one page-processing pass across all callers.
        assert_eq!(fx.sampler.calls.load(Ordering::SeqCst), 3);

        let first = &results[0];
        for index in &results {
            assert_eq!(index.total_pages, first.total_pages);
            assert_eq!(index.file_hash, first.file_hash);
        }
    }

    #[tokio::test]
    async fn test_blank_page_gets_placeholder() {
        let fx = fixture(
            FakeSource::with_texts(&["   ", "real text"]),
            FakeSampler::new("s"),
        );

        let index = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();

        assert_eq!(index.pages[0].summary, "blank page");
        assert!(index.pages[0].error.is_none());
        assert_eq!(index.pages[1].summary, "s");
        // Only the non-blank page reached the model.
        assert_eq!(fx.sampler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ocr_fallback_for_imageonly_page() {
        let source = FakeSource {
            pages: vec![ExtractedPage {
                text: String::new(),
                image_png: Some(vec![1, 2, 3]),
            }],
            failing_pages: Vec::new(),
            extract_calls: AtomicUsize::new(0),
        };

        let fx = fixture(
            source,
            FakeSampler::with_vision(r#"{"text": "scanned body", "summary": "A scan."}"#),
        );

        let index = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();

        assert_eq!(index.pages[0].text, "scanned body");
        assert_eq!(index.pages[0].summary, "A scan.");
        assert!(index.pages[0].error.is_none());
    }

    #[tokio::test]
    async fn test_ocr_parse_failure_degrades() {
        let source = FakeSource {
            pages: vec![ExtractedPage {
                text: String::new(),
                image_png: Some(vec![1, 2, 3]),
            }],
            failing_pages: Vec::new(),
            extract_calls: AtomicUsize::new(0),
        };

        let fx = fixture(source, FakeSampler::with_vision("just some prose"));
        let index = fx.builder.get_or_build(&fx.pdf_path).await.unwrap();

        assert_eq!(index.pages[0].text, "just some prose");
        assert_eq!(index.pages[0].summary, "parse failed");
        assert!(index.pages[0].error.is_none());
    }

    #[tokio::test]
    async fn test_no_channel_fails_before_processing() {
        let doc_dir = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();
        let pdf_path = doc_dir.path().join("doc.pdf");
        std::fs::write(&pdf_path, b"bytes").unwrap();

        let source = FakeSource::with_texts(&["text"]);
        let gateway = LanguageModelGateway::from_config(&crate::config::Config::default());
        let builder = IndexBuilder::new(
            Arc::new(source),
            Arc::new(gateway),
            IndexStore::new(index_dir.path()),
        );

        let result = builder.get_or_build(&pdf_path).await;
        assert!(matches!(result, Err(IndexError::NoLanguageModel { .. })));
        // Nothing partial is persisted.
        assert!(builder.store.load(&pdf_path).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_document_propagates() {
        let fx = fixture(FakeSource::with_texts(&["x"]), FakeSampler::new("s"));
        let result = fx.builder.get_or_build(Path::new("/nonexistent.pdf")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte safety
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
