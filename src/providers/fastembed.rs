//! Local embedding backend using fastembed ONNX models.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use std::sync::Arc;

use super::EmbeddingProvider;
use crate::error::{DoclensError, DoclensResult};

const PROVIDER: &str = "fastembed";

/// Embeds text in-process; inference runs on the blocking pool.
pub struct FastEmbedProvider {
    /// The embedding model (wrapped in Mutex for interior mutability)
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
}

impl FastEmbedProvider {
    /// Create a provider for a model given by its settings name.
    pub fn from_model_name(name: &str) -> DoclensResult<Self> {
        let model = parse_model(name)?;
        let text_model = TextEmbedding::try_new(
            InitOptions::new(model).with_show_download_progress(false),
        )
        .map_err(|e| DoclensError::Provider {
            provider: PROVIDER,
            message: format!("failed to initialize {name}: {e}"),
        })?;

        tracing::info!(target: "provider", "loaded local embedding model {name}");

        Ok(Self {
            model: Arc::new(Mutex::new(text_model)),
            model_name: name.to_string(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn parse_model(name: &str) -> DoclensResult<EmbeddingModel> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "NomicEmbedTextV15" | "nomic-embed-text" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        other => Err(DoclensError::config(format!(
            "unknown local embedding model '{other}'"
        ))),
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> DoclensResult<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();

        let embeddings = tokio::task::spawn_blocking(move || model.lock().embed(vec![text], None))
            .await
            .map_err(|e| DoclensError::Embedding(format!("embedding task failed: {e}")))?
            .map_err(|e| DoclensError::Embedding(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| DoclensError::Embedding("No embedding generated".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_names() {
        assert!(parse_model("AllMiniLML6V2").is_ok());
        assert!(parse_model("nomic-embed-text").is_ok());
        assert!(parse_model("gpt-4").is_err());
    }

    #[tokio::test]
    #[ignore = "Downloads 86MB model - run with --ignored"]
    async fn test_embed_dimensions() {
        let provider = FastEmbedProvider::from_model_name("AllMiniLML6V2").unwrap();
        let embedding = provider.embed("Parse JSON data").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
