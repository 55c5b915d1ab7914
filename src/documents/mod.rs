//! Document loading and chunking for the ingest path.
//!
//! This module provides:
//! - Page-level loading of PDF and text documents
//! - Boundary-aware sliding window chunking with overlap
//! - Chunk metadata carried through to the vector index

pub mod chunker;
pub mod config;
pub mod loader;
pub mod types;

pub use chunker::{Chunker, RawChunk, SlidingWindowChunker, split_pages};
pub use config::{ChunkingConfig, DocumentsConfig, IngestMode};
pub use loader::{DocumentFormat, load};
pub use types::{Chunk, ChunkMetadata, Document, Page};
