//! Configuration types for document chunking and ingest.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DoclensError, DoclensResult};

/// Top-level configuration for document ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Maximum chunk size in characters.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Overlap between adjacent chunks in characters.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,

    /// Whether an ingest replaces the live index or appends to it.
    #[serde(default)]
    pub mode: IngestMode,

    /// Directory where uploaded documents are stored before ingest.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("docs")
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            overlap_chars: default_overlap_chars(),
            mode: IngestMode::default(),
            upload_dir: default_upload_dir(),
        }
    }
}

impl DocumentsConfig {
    /// Chunking parameters applied to every ingested document.
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig::new(self.max_chunk_chars, self.overlap_chars)
    }
}

/// Configuration for document chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters. Larger spans are split.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Overlap between adjacent chunks in characters.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

fn default_max_chunk_chars() -> usize {
    1000
}

fn default_overlap_chars() -> usize {
    100
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

impl ChunkingConfig {
    pub fn new(max_chunk_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chunk_chars,
            overlap_chars,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> DoclensResult<()> {
        if self.max_chunk_chars == 0 {
            return Err(DoclensError::config("max_chunk_chars must be greater than 0"));
        }

        if self.overlap_chars >= self.max_chunk_chars {
            return Err(DoclensError::config(format!(
                "overlap_chars ({}) must be less than max_chunk_chars ({})",
                self.overlap_chars, self.max_chunk_chars
            )));
        }

        Ok(())
    }
}

/// How a new ingest interacts with the existing index.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// The new document's index replaces the previous one.
    #[default]
    Replace,
    /// Records are appended to the existing index.
    Append,
}

impl std::str::FromStr for IngestMode {
    type Err = DoclensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Ok(IngestMode::Replace),
            "append" => Ok(IngestMode::Append),
            other => Err(DoclensError::config(format!(
                "unknown ingest mode '{other}' (expected replace or append)"
            ))),
        }
    }
}

impl std::fmt::Display for IngestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestMode::Replace => f.write_str("replace"),
            IngestMode::Append => f.write_str("append"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_config_defaults() {
        let config = ChunkingConfig::default();
        assert_eq!(config.max_chunk_chars, 1000);
        assert_eq!(config.overlap_chars, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunking_config_validation() {
        let mut config = ChunkingConfig::default();

        // Invalid: zero size
        config.max_chunk_chars = 0;
        config.overlap_chars = 0;
        assert!(config.validate().is_err());

        // Invalid: overlap >= max
        config.max_chunk_chars = 100;
        config.overlap_chars = 100;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);

        // Zero overlap is fine
        config.overlap_chars = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ingest_mode_parsing() {
        assert_eq!("append".parse::<IngestMode>().unwrap(), IngestMode::Append);
        assert_eq!("REPLACE".parse::<IngestMode>().unwrap(), IngestMode::Replace);
        assert!("merge".parse::<IngestMode>().is_err());
        assert_eq!(IngestMode::default(), IngestMode::Replace);
    }

    #[test]
    fn test_documents_config_from_toml() {
        let config: DocumentsConfig = toml::from_str(
            r#"
max_chunk_chars = 500
mode = "append"
"#,
        )
        .unwrap();
        assert_eq!(config.chunking().max_chunk_chars, 500);
        assert_eq!(config.chunking().overlap_chars, 100);
        assert_eq!(config.mode, IngestMode::Append);
        assert_eq!(config.upload_dir, PathBuf::from("docs"));
    }
}
