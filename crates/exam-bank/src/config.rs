//! Configuration for the question bank pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Generation service configuration
    pub llm: LlmConfig,
    /// Text chunking configuration
    pub chunking: ChunkingConfig,
    /// Response parser configuration
    pub parser: ParserConfig,
    /// Text extraction configuration
    pub extraction: ExtractionConfig,
    /// SQLite store configuration
    pub storage: StorageConfig,
    /// Subject inference configuration
    pub subjects: SubjectConfig,
}

impl BankConfig {
    /// Load configuration from an optional TOML file.
    ///
    /// Missing sections fall back to defaults. The Gemini credential is taken
    /// from `GEMINI_API_KEY` when the file does not set one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var(GEMINI_API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }
}

/// Generation backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Google Gemini API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

/// Generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which backend to call
    pub backend: LlmBackend,
    /// API base URL; backend default when unset
    pub base_url: Option<String>,
    /// Generation model name; backend default when unset
    pub model: Option<String>,
    /// API key (Gemini only)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum output tokens per call
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Gemini,
            base_url: None,
            model: None,
            api_key: None,
            temperature: 0.2,
            max_output_tokens: 1024,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Resolved API base URL, without a trailing slash
    pub fn base_url(&self) -> String {
        let url = match (&self.base_url, &self.backend) {
            (Some(url), _) => url.as_str(),
            (None, LlmBackend::Gemini) => "https://generativelanguage.googleapis.com",
            (None, LlmBackend::Ollama) => "http://localhost:11434",
        };
        url.trim_end_matches('/').to_string()
    }

    /// Resolved generation model
    pub fn model(&self) -> String {
        match (&self.model, &self.backend) {
            (Some(model), _) => model.clone(),
            (None, LlmBackend::Gemini) => "gemini-2.5-flash".to_string(),
            (None, LlmBackend::Ollama) => "llama3.2:3b".to_string(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: 4000 }
    }
}

/// Structured-response parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Characters of chunk text embedded in one prompt
    pub max_prompt_chars: usize,
    /// Longest plausible choice; longer ones mean the model broke format
    pub max_choice_chars: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 5000,
            max_choice_chars: 300,
        }
    }
}

/// Text extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Upper bound for pdf-extract before falling back to lopdf
    pub pdf_timeout_secs: u64,
    /// LibreOffice binary used to convert legacy .ppt decks
    pub libreoffice_bin: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdf_timeout_secs: 60,
            libreoffice_bin: "libreoffice".to_string(),
        }
    }
}

/// SQLite store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("database").join("cert_problems.db"),
        }
    }
}

/// Subject inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectConfig {
    /// Label used when nothing is left of the filename
    pub default_label: String,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            default_label: "General".to_string(),
        }
    }
}
