//! Configuration for the page indexer.
//!
//! Supports both environment variables and a YAML config file.
//! Environment variables take precedence over config file values.
//!
//! Both the fallback completion endpoint and the OCR vision endpoint are
//! optional: leaving one unconfigured disables that channel instead of
//! failing startup.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Fallback completion endpoint configuration (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the completion API (e.g., "https://api.openai.com")
    #[serde(default)]
    pub base_url: String,

    /// API key for authentication
    #[serde(default)]
    pub api_key: String,

    /// Model name (e.g., "gpt-4o-mini")
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// OCR-capable vision model endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OcrConfig {
    /// Base URL for the vision API
    #[serde(default)]
    pub base_url: String,

    /// API key for authentication
    #[serde(default)]
    pub api_key: String,

    /// Vision model name
    #[serde(default)]
    pub model: String,
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Fallback completion endpoint settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// OCR vision endpoint settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Directory holding persisted index files. Defaults to `~/.pageindex`.
    #[serde(default)]
    pub index_dir: Option<PathBuf>,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    ocr: Option<OcrFileSection>,
    index_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OcrFileSection {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (PAGEINDEX_LLM_*, PAGEINDEX_OCR_*)
    /// 2. Config file (~/.config/pdf-page-index/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file first
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        // Override with environment variables
        if let Ok(base_url) = env::var("PAGEINDEX_LLM_BASE_URL") {
            config.llm.base_url = base_url;
        }

        if let Ok(api_key) = env::var("PAGEINDEX_LLM_API_KEY") {
            config.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("PAGEINDEX_LLM_MODEL") {
            config.llm.model = model;
        }

        if let Ok(max_tokens) = env::var("PAGEINDEX_LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                config.llm.max_tokens = tokens;
            }
        }

        if let Ok(temperature) = env::var("PAGEINDEX_LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                config.llm.temperature = temp;
            }
        }

        if let Ok(base_url) = env::var("PAGEINDEX_OCR_BASE_URL") {
            config.ocr.base_url = base_url;
        }

        if let Ok(api_key) = env::var("PAGEINDEX_OCR_API_KEY") {
            config.ocr.api_key = api_key;
        }

        if let Ok(model) = env::var("PAGEINDEX_OCR_MODEL") {
            config.ocr.model = model;
        }

        if let Ok(dir) = env::var("PAGEINDEX_INDEX_DIR") {
            config.index_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;

        let file_config: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| IndexError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(base_url) = llm.base_url {
                config.llm.base_url = base_url;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        if let Some(ocr) = file_config.ocr {
            if let Some(base_url) = ocr.base_url {
                config.ocr.base_url = base_url;
            }
            if let Some(api_key) = ocr.api_key {
                config.ocr.api_key = api_key;
            }
            if let Some(model) = ocr.model {
                config.ocr.model = model;
            }
        }

        config.index_dir = file_config.index_dir;

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pdf-page-index")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Whether the fallback completion endpoint is usable.
    pub fn is_llm_configured(&self) -> bool {
        !self.llm.base_url.is_empty() && !self.llm.api_key.is_empty()
    }

    /// Whether the OCR vision endpoint is usable.
    pub fn is_ocr_configured(&self) -> bool {
        !self.ocr.base_url.is_empty()
            && !self.ocr.api_key.is_empty()
            && !self.ocr.model.is_empty()
    }

    /// Validate internal consistency. Missing endpoints are fine (the
    /// channel is simply disabled); a configured endpoint with no model is not.
    pub fn validate(&self) -> Result<()> {
        if self.is_llm_configured() && self.llm.model.is_empty() {
            return Err(IndexError::Config(
                "LLM endpoint configured but model name is empty. Set PAGEINDEX_LLM_MODEL."
                    .to_string(),
            ));
        }

        if !self.ocr.base_url.is_empty() && self.ocr.model.is_empty() {
            return Err(IndexError::Config(
                "OCR endpoint configured but model name is empty. Set PAGEINDEX_OCR_MODEL."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config from explicit LLM values (useful for testing).
    pub fn with_llm(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                base_url: base_url.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
