//! Language-model gateway: one call contract over two channels.
//!
//! The native channel routes through the calling client's own sampling
//! capability (injected by the embedding transport as a [`NativeSampler`]).
//! The fallback channel uses directly configured HTTP completion endpoints:
//! one for text completion, one for OCR-capable vision requests.
//!
//! Channel selection is an explicit capability probe per call: prefer
//! native, fall back to the matching HTTP client, otherwise fail with
//! `NoLanguageModel`. The gateway never retries; backend failures surface
//! verbatim, tagged with the channel that produced them.

use crate::config::Config;
use crate::error::{Channel, IndexError, Result};
use crate::llm::client::HttpCompletionClient;
use crate::llm::extract_json;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// One part of a prompt: a text instruction or an inline PNG image.
#[derive(Debug, Clone)]
pub enum PromptPart {
    Text(String),
    ImagePng(Vec<u8>),
}

/// Sampling capability provided by the calling client.
///
/// The protocol transport that owns the client connection implements this;
/// tests inject fakes through the same seam.
#[async_trait]
pub trait NativeSampler: Send + Sync {
    /// Complete the prompt using the caller's own reasoning capability.
    async fn sample(&self, parts: &[PromptPart]) -> Result<String>;

    /// Whether image parts can be included in a sampling request.
    fn supports_vision(&self) -> bool {
        false
    }
}

/// Resolved channel for a single call.
enum Selected<'a> {
    Native(&'a dyn NativeSampler),
    Http(&'a HttpCompletionClient),
}

/// Unified language-model access over the native and fallback channels.
pub struct LanguageModelGateway {
    native: Option<Arc<dyn NativeSampler>>,
    completion: Option<HttpCompletionClient>,
    vision: Option<HttpCompletionClient>,
}

impl LanguageModelGateway {
    /// Build the gateway from configuration. Unconfigured endpoints simply
    /// leave that fallback channel disabled.
    pub fn from_config(config: &Config) -> Self {
        let completion = config
            .is_llm_configured()
            .then(|| HttpCompletionClient::from_llm_config(&config.llm));
        let vision = config
            .is_ocr_configured()
            .then(|| HttpCompletionClient::from_ocr_config(&config.ocr));

        Self {
            native: None,
            completion,
            vision,
        }
    }

    /// Attach the calling client's sampling capability.
    pub fn with_native(mut self, sampler: Arc<dyn NativeSampler>) -> Self {
        self.native = Some(sampler);
        self
    }

    /// Whether any channel exists at all.
    pub fn has_any_channel(&self) -> bool {
        self.native.is_some() || self.completion.is_some() || self.vision.is_some()
    }

    /// Whether a vision-capable channel exists at all.
    pub fn supports_vision(&self) -> bool {
        self.vision.is_some()
            || self
                .native
                .as_ref()
                .is_some_and(|sampler| sampler.supports_vision())
    }

    /// Capability probe: pick the channel for this call, once.
    fn select(&self, needs_vision: bool) -> Result<Selected<'_>> {
        if let Some(native) = &self.native {
            if !needs_vision || native.supports_vision() {
                return Ok(Selected::Native(native.as_ref()));
            }
        }

        let http = if needs_vision {
            &self.vision
        } else {
            &self.completion
        };

        match http {
            Some(client) => Ok(Selected::Http(client)),
            None => Err(IndexError::NoLanguageModel { needs_vision }),
        }
    }

    /// Complete a prompt. `system` applies to the HTTP channel only; the
    /// native channel receives the user parts as-is.
    pub async fn complete(&self, system: Option<&str>, parts: &[PromptPart]) -> Result<String> {
        let needs_vision = parts.iter().any(|p| matches!(p, PromptPart::ImagePng(_)));

        match self.select(needs_vision)? {
            Selected::Native(sampler) => {
                sampler.sample(parts).await.map_err(|e| match e {
                    err @ IndexError::LlmApi { .. } => err,
                    other => IndexError::LlmApi {
                        channel: Channel::Native,
                        message: other.to_string(),
                    },
                })
            }
            Selected::Http(client) => client.complete(system, parts).await,
        }
    }
}

/// Outcome of an OCR+summarize call.
///
/// An unparseable model response degrades to the raw text instead of
/// failing the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// The model returned the expected `{text, summary}` structure.
    Structured { text: String, summary: String },
    /// The response did not parse; the raw response stands in for the text.
    Degraded { raw: String },
}

/// Parse an OCR+summarize response into its two-outcome result.
pub fn parse_ocr_response(response: &str) -> OcrOutcome {
    #[derive(Deserialize)]
    struct OcrResponse {
        text: String,
        summary: String,
    }

    let json_str = extract_json(response);
    match serde_json::from_str::<OcrResponse>(&json_str) {
        Ok(parsed) => OcrOutcome::Structured {
            text: parsed.text,
            summary: parsed.summary,
        },
        Err(_) => OcrOutcome::Degraded {
            raw: response.trim().to_string(),
        },
    }
}
