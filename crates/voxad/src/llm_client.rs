//! HTTP client for hosted text-completion models.
//!
//! Speaks three wire formats, picked from the endpoint URL:
//! - Gemini `generateContent` (default)
//! - OpenAI-compatible chat completions
//! - Ollama `/api/chat`
//!
//! The client is a plain "prompt in, text out" capability. Prompt
//! construction and reply parsing live in `fallback`.

use crate::fallback::TextCompletion;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_LLM_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Gemini,
    OpenAi,
    Ollama,
}

pub struct LlmClient {
    http_client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
    api_format: ApiFormat,
}

impl LlmClient {
    pub fn new(api_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        Self {
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_format: Self::detect_api_format(&api_url),
            api_url,
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Detect API format from URL
    pub fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("generativelanguage.googleapis.com") {
            ApiFormat::Gemini
        } else if url.ends_with("/api/chat") || url.contains(":11434") {
            ApiFormat::Ollama
        } else {
            ApiFormat::OpenAi
        }
    }

    pub fn api_format(&self) -> ApiFormat {
        self.api_format
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn require_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("no API key configured for {}", self.api_url))
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", self.require_key()?)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let completion: GeminiResponse = Self::read_json(response).await?;
        completion
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(self.require_key()?)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to completion API")?;

        let completion: OpenAiResponse = Self::read_json(response).await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("Completion API returned no choices"))
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            format: Some("json".to_string()),
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        let completion: OllamaResponse = Self::read_json(response).await?;
        Ok(completion.message.content)
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("[-]  Model API error {}: {}", status, error_text);
            bail!("Model API returned error {}: {}", status, error_text);
        }
        response
            .json()
            .await
            .context("Failed to parse model API response")
    }
}

#[async_trait]
impl TextCompletion for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        info!("[>]  LLM CALL [{}] ({:?}, {} chars)", self.model, self.api_format, prompt.len());
        let text = match self.api_format {
            ApiFormat::Gemini => self.complete_gemini(prompt).await?,
            ApiFormat::OpenAi => self.complete_openai(prompt).await?,
            ApiFormat::Ollama => self.complete_ollama(prompt).await?,
        };
        debug!(
            "[<]  LLM RESPONSE ({} chars): {}",
            text.len(),
            text.chars().take(500).collect::<String>()
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// Gemini format
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

// OpenAI-compatible format
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

// Ollama format
#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: ChatMessage,
}

// Shared
#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}
