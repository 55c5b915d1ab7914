//! Core types for loaded documents and their chunks.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single page of extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Extracted text of the page.
    pub text: String,

    /// 1-indexed page number within the document.
    pub page_number: u32,

    /// Path of the document this page came from.
    pub source_path: PathBuf,
}

impl Page {
    /// Create a new page.
    pub fn new(text: impl Into<String>, page_number: u32, source_path: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            page_number,
            source_path: source_path.into(),
        }
    }

    /// Get the length of the page text in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// An ordered, immutable sequence of pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source_path: PathBuf,
    pages: Vec<Page>,
}

impl Document {
    /// Create a document from pages already in document order.
    pub fn new(source_path: impl Into<PathBuf>, pages: Vec<Page>) -> Self {
        Self {
            source_path: source_path.into(),
            pages,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when no page carries any text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// Metadata carried by every chunk and every index record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path to the source document.
    pub source_path: PathBuf,

    /// Page the chunk was cut from (1-indexed).
    pub page_number: u32,

    /// Global position of the chunk within the ingested document(s).
    pub chunk_index: u64,

    /// Character range within the page text (start, end).
    pub char_range: (usize, usize),
}

/// A contiguous span of page text prepared for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The text content of this chunk.
    pub text: String,

    /// Source metadata.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(text: String, metadata: ChunkMetadata) -> Self {
        Self { text, metadata }
    }

    pub fn chunk_index(&self) -> u64 {
        self.metadata.chunk_index
    }

    pub fn page_number(&self) -> u32 {
        self.metadata.page_number
    }

    /// Get a preview of the content (first N characters).
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }

    /// Get the length of the content in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
