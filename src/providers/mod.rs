//! External model boundaries.
//!
//! The vector index and the query engine only see the two narrow traits
//! below; concrete backends (Ollama over HTTP, local fastembed models) live
//! in submodules and are selected from settings.

mod ollama;
#[cfg(feature = "local-embeddings")]
mod fastembed;

pub use ollama::{DEFAULT_OLLAMA_URL, OllamaClient};
#[cfg(feature = "local-embeddings")]
pub use self::fastembed::FastEmbedProvider;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{EmbeddingBackend, Settings};
use crate::error::{DoclensError, DoclensResult};

/// Maps a text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name used in logs and timeout errors.
    fn name(&self) -> &'static str;

    async fn embed(&self, text: &str) -> DoclensResult<Vec<f32>>;
}

/// Produces a completion for a prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short provider name used in logs and timeout errors.
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> DoclensResult<String>;
}

/// Run a provider call under a deadline.
///
/// Elapsed deadlines surface as [`DoclensError::ProviderTimeout`]; the
/// call's own result passes through untouched.
pub async fn with_timeout<T, F>(provider: &'static str, limit: Duration, call: F) -> DoclensResult<T>
where
    F: Future<Output = DoclensResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(target: "provider", "{provider} call exceeded {}ms", limit.as_millis());
            Err(DoclensError::ProviderTimeout {
                provider,
                timeout: limit,
            })
        }
    }
}

/// Embedding provider and language model built from settings.
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LanguageModel>,
}

/// Create the configured providers.
pub fn from_settings(settings: &Settings) -> DoclensResult<Providers> {
    let embedder: Arc<dyn EmbeddingProvider> = match settings.embedding.backend {
        EmbeddingBackend::Ollama => Arc::new(OllamaClient::new(
            &settings.embedding.base_url,
            &settings.embedding.model,
        )?),
        EmbeddingBackend::Fastembed => local_embedder(&settings.embedding.model)?,
    };

    let llm = Arc::new(OllamaClient::new(&settings.llm.base_url, &settings.llm.model)?);

    tracing::debug!(
        target: "provider",
        "embedding: {} ({}), llm: {}",
        embedder.name(),
        settings.embedding.model,
        settings.llm.model
    );

    Ok(Providers { embedder, llm })
}

#[cfg(feature = "local-embeddings")]
fn local_embedder(model: &str) -> DoclensResult<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(FastEmbedProvider::from_model_name(model)?))
}

#[cfg(not(feature = "local-embeddings"))]
fn local_embedder(_model: &str) -> DoclensResult<Arc<dyn EmbeddingProvider>> {
    Err(DoclensError::config(
        "embedding backend 'fastembed' requires building with the local-embeddings feature",
    ))
}
