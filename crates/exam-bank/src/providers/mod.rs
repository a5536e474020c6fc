//! Generation service providers
//!
//! The parser only sees the `LlmProvider` trait; the backend is picked from
//! configuration and handed to it explicitly.

pub mod gemini;
pub mod llm;
pub mod ollama;

use std::sync::Arc;

use crate::config::{LlmBackend, LlmConfig};
use crate::error::Result;

pub use gemini::GeminiClient;
pub use llm::LlmProvider;
pub use ollama::OllamaLlm;

/// Build the configured generation backend
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Gemini => Arc::new(GeminiClient::new(config)?),
        LlmBackend::Ollama => Arc::new(OllamaLlm::new(config)?),
    };

    tracing::info!("Using {} provider with model {}", provider.name(), provider.model());
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_provider() {
        let ollama = build_provider(&LlmConfig {
            backend: LlmBackend::Ollama,
            ..LlmConfig::default()
        })
        .unwrap();
        assert_eq!(ollama.name(), "ollama");
        assert_eq!(ollama.model(), "llama3.2:3b");

        assert!(build_provider(&LlmConfig::default()).is_err());
    }
}
