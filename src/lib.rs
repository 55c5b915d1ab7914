//! Local document question answering.
//!
//! Documents flow through a fixed pipeline:
//! loader → chunker → embedding provider → vector index → query engine.
//! The [`rag::QueryEngine`] owns the live index snapshot and exposes
//! `ingest` and `query`; the CLI and the HTTP server are thin layers on top.

pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod logging;
pub mod providers;
pub mod rag;
#[cfg(feature = "http-server")]
pub mod server;
pub mod storage;
pub mod vector;

pub use config::Settings;
pub use documents::{Chunk, ChunkMetadata, ChunkingConfig, Document, IngestMode, Page};
pub use error::{DoclensError, DoclensResult, ErrorKind, QueryStage};
pub use providers::{EmbeddingProvider, LanguageModel};
pub use rag::{Answer, EngineOptions, EngineState, IngestOptions, IngestReport, QueryEngine};
pub use storage::{FsStorage, IndexStorage, MemoryStorage};
pub use vector::{SearchHit, SimilarityMetric, VectorIndex};
