//! LLM-driven semantic ranking of indexed pages.
//!
//! Builds one prompt enumerating every usable page summary, asks the
//! language model to select and order the most relevant pages, and parses
//! the structured response. A ranking miss (unparseable response) returns
//! an empty result list, never an error.

use crate::error::Result;
use crate::index::{DocumentIndex, SearchResult};
use crate::llm::{extract_json, LanguageModelGateway, PromptPart, Prompts};
use serde::Deserialize;
use std::sync::Arc;

/// Ranks pages of a built index against a free-text query.
pub struct SearchRanker {
    gateway: Arc<LanguageModelGateway>,
}

impl SearchRanker {
    /// Create a new ranker.
    pub fn new(gateway: Arc<LanguageModelGateway>) -> Self {
        Self { gateway }
    }

    /// Rank pages by relevance to `query`, returning at most `top_k`
    /// results. Pages with a processing error are never candidates, and no
    /// result references a page absent from the index.
    pub async fn rank(
        &self,
        index: &DocumentIndex,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let top_k = top_k.max(1);

        let summaries = index
            .usable_pages()
            .map(|p| {
                let summary = if p.summary.is_empty() {
                    "no summary"
                } else {
                    p.summary.as_str()
                };
                format!("Page {}: {}", p.page, summary)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = Prompts::rank_pages()
            .replace("{query}", query)
            .replace("{summaries}", &summaries)
            .replace("{top_k}", &top_k.to_string());

        let response = self
            .gateway
            .complete(
                Some(Prompts::system_document_analyzer()),
                &[PromptPart::Text(prompt)],
            )
            .await?;

        let mut results = parse_rank_response(&response);

        // The model may hallucinate page numbers or resurface errored
        // pages; both are dropped rather than surfaced.
        results.retain(|r| index.page(r.page).is_some_and(|p| p.error.is_none()));
        results.truncate(top_k);

        Ok(results)
    }
}

/// Parse a ranking response. Unparseable responses yield an empty list.
fn parse_rank_response(response: &str) -> Vec<SearchResult> {
    #[derive(Deserialize)]
    struct RankResponse {
        #[serde(default)]
        results: Vec<SearchResult>,
    }

    let json_str = extract_json(response);
    match serde_json::from_str::<RankResponse>(&json_str) {
        Ok(parsed) => parsed.results,
        Err(e) => {
            tracing::warn!(error = %e, "ranking response did not parse, returning no results");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Result;
    use crate::index::PageRecord;
    use crate::llm::NativeSampler;
    use async_trait::async_trait;

    struct FakeSampler {
        reply: String,
    }

    #[async_trait]
    impl NativeSampler for FakeSampler {
        async fn sample(&self, _parts: &[PromptPart]) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    fn ranker(reply: &str) -> SearchRanker {
        let gateway = LanguageModelGateway::from_config(&Config::default()).with_native(
            Arc::new(FakeSampler {
                reply: reply.to_string(),
            }),
        );
        SearchRanker::new(Arc::new(gateway))
    }

    fn sample_index() -> DocumentIndex {
        let pages = vec![
            PageRecord::new(1, "intro", "Introduction to the topic."),
            PageRecord::new(2, "methods", "Methods used."),
            PageRecord::failed(3, "extraction failed"),
            PageRecord::new(4, "results", "Experimental results."),
        ];
        DocumentIndex::new("/docs/paper.pdf", "hash", pages)
    }

    #[tokio::test]
    async fn test_rank_returns_parsed_results() {
        let reply = r#"{"results": [
            {"page": 4, "relevance": "contains the results"},
            {"page": 1, "relevance": "introduces the topic"}
        ]}"#;

        let results = ranker(reply)
            .rank(&sample_index(), "what were the results?", 5)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].page, 4);
        assert_eq!(results[1].page, 1);
    }

    #[tokio::test]
    async fn test_rank_bounds_to_top_k() {
        let reply = r#"{"results": [
            {"page": 1, "relevance": "a"},
            {"page": 2, "relevance": "b"},
            {"page": 4, "relevance": "c"}
        ]}"#;

        let results = ranker(reply)
            .rank(&sample_index(), "query", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_rank_drops_unknown_and_errored_pages() {
        let reply = r#"{"results": [
            {"page": 3, "relevance": "errored page"},
            {"page": 99, "relevance": "does not exist"},
            {"page": 2, "relevance": "valid"}
        ]}"#;

        let results = ranker(reply)
            .rank(&sample_index(), "query", 5)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page, 2);
    }

    #[tokio::test]
    async fn test_unparseable_response_yields_empty() {
        let results = ranker("I could not decide on any pages.")
            .rank(&sample_index(), "query", 5)
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_markdown_wrapped_response_parses() {
        let reply = "```json\n{\"results\": [{\"page\": 1, \"relevance\": \"r\"}]}\n```";

        let results = ranker(reply)
            .rank(&sample_index(), "query", 5)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
    }
}
