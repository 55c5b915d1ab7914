//! Configuration module for the document query service.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DL_` and use double underscores
//! to separate nested levels:
//! - `DL_RETRIEVAL__TOP_K=8` sets `retrieval.top_k`
//! - `DL_LLM__MODEL=llama3.2` sets `llm.model`
//! - `DL_DOCUMENTS__MAX_CHUNK_CHARS=500` sets `documents.max_chunk_chars`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::documents::DocumentsConfig;
use crate::error::{DoclensError, DoclensResult};
use crate::providers::DEFAULT_OLLAMA_URL;
use crate::vector::SimilarityMetric;

/// Directory holding the workspace configuration.
pub const CONFIG_DIR: &str = ".doclens";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DL_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the persisted vector index
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .doclens is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Loading and chunking of ingested documents
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Language model used for answer synthesis
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Limits applied to every provider call
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `ingest = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

/// Which embedding backend serves `embedding.model`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama `/api/embed`
    #[default]
    Ollama,
    /// In-process fastembed model (requires the `local-embeddings` feature)
    Fastembed,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Model to use for embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Ollama endpoint (ignored by local backends)
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the language model
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Similarity metric for newly built indexes
    #[serde(default)]
    pub metric: SimilarityMetric,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    /// Deadline for a single embedding or completion call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted upload in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub cors: bool,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from("vector_store")
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_llm_model() -> String {
    "gemma3n:e4b".to_string()
}
fn default_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}
fn default_top_k() -> usize {
    4
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_max_upload_mb() -> usize {
    64
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            workspace_root: None,
            logging: LoggingConfig::default(),
            documents: DocumentsConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            providers: ProvidersConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            base_url: default_base_url(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_base_url(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            metric: SimilarityMetric::default(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProvidersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_mb: default_max_upload_mb(),
            cors: true,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .doclens directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| Path::new(CONFIG_DIR).join("settings.toml"));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                // If workspace_root is not set in config, detect it
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore (__) separates nested levels; single
            // underscores stay part of the field name
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Find the workspace config by looking for a .doclens directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .doclens is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Check values that deserialize fine but cannot run.
    pub fn validate(&self) -> DoclensResult<()> {
        self.documents.chunking().validate()?;
        if self.retrieval.top_k == 0 {
            return Err(DoclensError::config("retrieval.top_k must be at least 1"));
        }
        if self.providers.request_timeout_secs == 0 {
            return Err(DoclensError::config(
                "providers.request_timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }

    /// Index directory, resolved against the workspace root when relative.
    pub fn resolved_index_path(&self) -> PathBuf {
        self.resolve(&self.index_path)
    }

    /// Upload directory, resolved against the workspace root when relative.
    pub fn resolved_upload_dir(&self) -> PathBuf {
        self.resolve(&self.documents.upload_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = Path::new(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::IngestMode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.index_path, PathBuf::from("vector_store"));
        assert_eq!(settings.documents.max_chunk_chars, 1000);
        assert_eq!(settings.documents.overlap_chars, 100);
        assert_eq!(settings.embedding.model, "nomic-embed-text");
        assert_eq!(settings.llm.model, "gemma3n:e4b");
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.retrieval.metric, SimilarityMetric::Cosine);
        assert_eq!(settings.logging.default, "warn");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2
index_path = "/var/lib/doclens"

[documents]
max_chunk_chars = 500
overlap_chars = 50
mode = "append"

[retrieval]
top_k = 6
metric = "l2"

[embedding]
backend = "fastembed"
model = "AllMiniLML6V2"

[logging.modules]
ingest = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.index_path, PathBuf::from("/var/lib/doclens"));
        assert_eq!(settings.documents.chunking().max_chunk_chars, 500);
        assert_eq!(settings.documents.mode, IngestMode::Append);
        assert_eq!(settings.retrieval.top_k, 6);
        assert_eq!(settings.retrieval.metric, SimilarityMetric::L2);
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Fastembed);
        assert_eq!(settings.logging.modules["ingest"], "debug");
        // Untouched sections keep defaults
        assert_eq!(settings.llm.model, "gemma3n:e4b");
        assert_eq!(settings.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.retrieval.top_k = 2;
        settings.server.bind = "0.0.0.0:9000".to_string();

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 2);
        assert_eq!(loaded.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.retrieval.top_k, 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.documents.overlap_chars = settings.documents.max_chunk_chars;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.retrieval.top_k = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.providers.request_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_resolve_relative_paths() {
        let mut settings = Settings::default();
        settings.workspace_root = Some(PathBuf::from("/work"));
        assert_eq!(settings.resolved_index_path(), PathBuf::from("/work/vector_store"));
        assert_eq!(settings.resolved_upload_dir(), PathBuf::from("/work/docs"));

        settings.index_path = PathBuf::from("/abs/store");
        assert_eq!(settings.resolved_index_path(), PathBuf::from("/abs/store"));
    }
}
