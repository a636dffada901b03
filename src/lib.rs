//! PDF Page Index - LLM-powered per-page PDF indexing and retrieval.
//!
//! Builds a per-page index of a PDF document: extract each page's text (or
//! rasterize it for OCR), summarize it with a language model, and persist
//! the result keyed by content hash. Cached indexes are reused until the
//! file's bytes change, and can be semantically ranked against a free-text
//! query.
//!
//! # Quick Start
//!
//! ```no_run
//! use pdf_page_index::{api::PdfIndexService, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let service = PdfIndexService::from_config(&config);
//!
//!     // Build (or reuse) the index, ranking it against a query
//!     let response = service
//!         .get_index("/docs/report.pdf", Some("quarterly revenue"), 5)
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!
//!     // Read one page's stored text and summary
//!     let detail = service.get_detail("/docs/report.pdf", 3);
//!     println!("{}", serde_json::to_string_pretty(&detail)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **PdfiumExtractor**: per-page text extraction and rasterization
//! - **LanguageModelGateway**: native sampling vs. HTTP completion channels
//! - **IndexStore**: content-hash-keyed JSON persistence
//! - **IndexBuilder**: cache check, page pipeline, build coordination
//! - **SearchRanker**: LLM ranking of page summaries against a query
//! - **DetailLookup**: read-only single-page access

pub mod api;
pub mod builder;
pub mod config;
pub mod detail;
pub mod error;
pub mod extract;
pub mod index;
pub mod llm;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use api::{DetailResponse, IndexResponse, PdfIndexService};
pub use builder::{BuildCoordinator, IndexBuilder, NoProgress, ProgressSink};
pub use config::Config;
pub use error::{IndexError, Result};
pub use extract::{ExtractedPage, PageSource, PdfiumExtractor};
pub use index::{DocumentIndex, PageRecord, SearchResult};
pub use llm::{LanguageModelGateway, NativeSampler, PromptPart};
pub use search::SearchRanker;
pub use store::IndexStore;
