//! Gemini client for question generation via the Generative Language API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::llm::{http_client, retry_with_backoff, LlmProvider};

/// Gemini client authenticated with an API key
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "topP")]
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a new Gemini client; the API key is required
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("Gemini API key is not set (GEMINI_API_KEY)".to_string()))?;

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config.base_url(),
            api_key,
            model: config.model(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            max_retries: config.max_retries,
        })
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_body(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                top_p: 0.9,
            },
        }
    }
}

/// First candidate's text parts, concatenated
fn response_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::llm("No text in Gemini response"));
    }

    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint();
        let body = serde_json::to_value(self.request_body(prompt))?;
        let client = self.client.clone();
        let api_key = self.api_key.clone();

        retry_with_backoff(self.max_retries, || {
            let url = url.clone();
            let body = body.clone();
            let client = client.clone();
            let api_key = api_key.clone();

            async move {
                let response = client
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Gemini request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::llm(format!(
                        "Gemini generation failed ({}): {}",
                        status, body
                    )));
                }

                let parsed: GenerateResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::llm(format!("Failed to parse Gemini response: {}", e)))?;

                response_text(parsed)
            }
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/v1beta/models/{}", self.base_url, self.model);

        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
