//! Ollama HTTP client.
//!
//! Implements both model boundaries against a local Ollama server:
//! - `POST /api/embed` for embeddings
//! - `POST /api/generate` (non-streaming) for completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{EmbeddingProvider, LanguageModel};
use crate::error::{DoclensError, DoclensResult};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

const PROVIDER: &str = "ollama";

/// Connection establishment limit. Request deadlines are applied by callers.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client bound to one Ollama model.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client for `model` served at `base_url`.
    pub fn new(base_url: &str, model: &str) -> DoclensResult<Self> {
        if model.trim().is_empty() {
            return Err(DoclensError::config("model name must not be empty"));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| provider_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, endpoint: &str, body: &Req) -> DoclensResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{endpoint}", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| provider_error(format!("failed to reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(target: "provider", "{url} returned {status}");
            return Err(provider_error(format!("HTTP {status}: {error_text}")));
        }

        response
            .json()
            .await
            .map_err(|e| provider_error(format!("failed to parse response from {url}: {e}")))
    }
}

fn provider_error(message: String) -> DoclensError {
    DoclensError::Provider {
        provider: PROVIDER,
        message,
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> DoclensResult<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbedResponse = self.post("/api/embed", &request).await?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DoclensError::Embedding(format!("{} returned no embedding", self.model)))
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> DoclensResult<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response: GenerateResponse = self.post("/api/generate", &request).await?;
        Ok(response.response)
    }
}
