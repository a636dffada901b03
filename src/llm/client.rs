//! OpenAI-compatible HTTP completion client.
//!
//! Works with any OpenAI-compatible chat-completions endpoint. Supports
//! plain text messages and vision messages carrying one inline PNG image
//! as a base64 data URL content part.

use crate::config::{LlmConfig, OcrConfig};
use crate::error::{Channel, IndexError, Result};
use crate::llm::gateway::PromptPart;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Message role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Message content: a plain string, or content parts for vision requests.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct ImageUrl {
    url: String,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize)]
struct Message {
    role: Role,
    content: MessageContent,
}

impl Message {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    fn user(parts: &[PromptPart]) -> Self {
        // A single text part stays a plain string for maximum endpoint
        // compatibility; anything with an image becomes content parts.
        let needs_parts = parts.iter().any(|p| matches!(p, PromptPart::ImagePng(_)));

        let content = if needs_parts {
            MessageContent::Parts(
                parts
                    .iter()
                    .map(|part| match part {
                        PromptPart::Text(text) => ContentPart::Text { text: text.clone() },
                        PromptPart::ImagePng(bytes) => ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!("data:image/png;base64,{}", STANDARD.encode(bytes)),
                            },
                        },
                    })
                    .collect(),
            )
        } else {
            let text = parts
                .iter()
                .map(|part| match part {
                    PromptPart::Text(text) => text.as_str(),
                    PromptPart::ImagePng(_) => unreachable!(),
                })
                .collect::<Vec<_>>()
                .join("\n");
            MessageContent::Text(text)
        };

        Self {
            role: Role::User,
            content,
        }
    }
}

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI-compatible completion client for one configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl HttpCompletionClient {
    /// Build a client for the fallback completion endpoint.
    pub fn from_llm_config(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
        }
    }

    /// Build a client for the OCR vision endpoint.
    pub fn from_ocr_config(config: &OcrConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Get the API endpoint URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/v1/chat/completions", base)
    }

    /// Send a completion request and return the generated text.
    pub async fn complete(&self, system: Option<&str>, parts: &[PromptPart]) -> Result<String> {
        let mut messages = Vec::new();

        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(parts));

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Try to parse as API error
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(IndexError::LlmApi {
                    channel: Channel::Http,
                    message: format!("API error ({}): {}", status, api_error.error.message),
                });
            }
            return Err(IndexError::LlmApi {
                channel: Channel::Http,
                message: format!("Request failed ({}): {}", status, body),
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;

        let choice = completion.choices.into_iter().next().ok_or_else(|| {
            IndexError::LlmApi {
                channel: Channel::Http,
                message: "No choices in response".to_string(),
            }
        })?;

        Ok(choice.message.content)
    }

    /// Test connectivity to the API.
    pub async fn test_connection(&self) -> Result<()> {
        let parts = [PromptPart::Text(
            "Say 'hello' and nothing else.".to_string(),
        )];

        let response = self.complete(None, &parts).await?;

        if response.to_lowercase().contains("hello") {
            Ok(())
        } else {
            Err(IndexError::LlmApi {
                channel: Channel::Http,
                message: format!("Unexpected response: {}", response),
            })
        }
    }
}
