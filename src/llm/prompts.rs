//! Prompt templates for summarization, OCR, and page ranking.

/// Collection of prompts used for page processing and search.
pub struct Prompts;

impl Prompts {
    /// Prompt to summarize one page of extracted text.
    ///
    /// Placeholders: `{page}`, `{content}`.
    pub fn summarize_page() -> &'static str {
        r#"Summarize the content of page {page} below in 1-2 sentences.

{content}

Return only the summary text. Do not add any prefix or explanation."#
    }

    /// Prompt to transcribe and summarize a rasterized page image.
    ///
    /// Placeholder: `{page}`. The page image is attached to the request.
    pub fn ocr_page() -> &'static str {
        r#"The attached image is page {page} of a PDF document.

Transcribe the text visible on the page, then summarize it in 1-2 sentences.

Reply in JSON format:
{
    "text": <the transcribed page text>,
    "summary": <1-2 sentence summary of the page>
}
Directly return the final JSON structure. Do not output anything else."#
    }

    /// Prompt to rank indexed pages against a query.
    ///
    /// Placeholders: `{query}`, `{summaries}`, `{top_k}`.
    pub fn rank_pages() -> &'static str {
        r#"Given the user query, find the most relevant pages from the page summaries below.

User query: {query}

Page summaries:
{summaries}

Return the most relevant page numbers (at most {top_k}), ordered by relevance.
Reply in JSON format:
{
    "results": [
        {
            "page": <page number>,
            "relevance": <why this page is relevant to the query>
        },
        ...
    ]
}
Directly return the final JSON structure. Do not output anything else."#
    }

    /// System prompt for all document-analysis calls.
    pub fn system_document_analyzer() -> &'static str {
        "You are an expert document analyzer. You summarize pages, transcribe page images, and rank pages by relevance. Always respond with valid JSON when requested."
    }
}
