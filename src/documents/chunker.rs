//! Document chunking strategies.
//!
//! Provides the `Chunker` trait and a boundary-aware sliding window
//! implementation for splitting page text into chunks suitable for embedding.

use super::config::ChunkingConfig;
use super::types::{Chunk, ChunkMetadata, Page};
use crate::error::DoclensResult;

/// A raw chunk before being assigned a global index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// Character range in the source text (start, end).
    pub char_range: (usize, usize),

    /// The text content of this chunk.
    pub content: String,
}

impl RawChunk {
    /// Create a new raw chunk.
    pub fn new(char_range: (usize, usize), content: String) -> Self {
        Self {
            char_range,
            content,
        }
    }

    /// Get character count.
    pub fn char_count(&self) -> usize {
        self.char_range.1 - self.char_range.0
    }
}

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split one page of text into chunks.
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Vec<RawChunk>;
}

/// Sliding window chunker that prefers natural boundaries.
///
/// Algorithm:
/// 1. Open a window of `max_chunk_chars` at the current start
/// 2. If the window reaches the end of the text, emit it and stop
/// 3. Otherwise look backwards through the second half of the window for a
///    paragraph, line, sentence, then word boundary; cut hard if none exists
/// 4. Start the next window `overlap_chars` before the cut
#[derive(Debug, Default)]
pub struct SlidingWindowChunker;

impl SlidingWindowChunker {
    /// Create a new sliding window chunker.
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for SlidingWindowChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Vec<RawChunk> {
        if content.is_empty() || config.max_chunk_chars == 0 {
            return Vec::new();
        }

        let chars: Vec<char> = content.chars().collect();
        let max_chars = config.max_chunk_chars;
        let overlap = config.overlap_chars.min(max_chars - 1);

        let mut result = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let hard_end = (start + max_chars).min(chars.len());
            let end = if hard_end == chars.len() {
                hard_end
            } else {
                find_cut(&chars, start, hard_end, max_chars, overlap)
            };

            result.push(RawChunk::new(
                (start, end),
                chars[start..end].iter().collect(),
            ));

            if end >= chars.len() {
                break;
            }

            let next = end.saturating_sub(overlap);
            start = if next > start { next } else { end };
        }

        result
    }
}

/// Boundary classes in order of preference.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

impl Boundary {
    /// Whether cutting right before `chars[pos]` lands on this boundary.
    fn matches(self, chars: &[char], pos: usize) -> bool {
        let prev = chars[pos - 1];
        match self {
            Boundary::Paragraph => pos >= 2 && prev == '\n' && chars[pos - 2] == '\n',
            Boundary::Line => prev == '\n',
            Boundary::Sentence => {
                pos >= 2 && prev.is_whitespace() && matches!(chars[pos - 2], '.' | '!' | '?')
            }
            Boundary::Word => prev.is_whitespace(),
        }
    }
}

/// Pick the end of a window that does not reach the end of the text.
///
/// The cut never falls before `start + max(max/2, overlap + 1)` so every
/// window advances past the previous one by at least one character.
fn find_cut(chars: &[char], start: usize, hard_end: usize, max_chars: usize, overlap: usize) -> usize {
    let min_end = (start + (max_chars / 2).max(overlap + 1)).min(hard_end);

    for boundary in BOUNDARIES {
        if let Some(pos) = (min_end..=hard_end)
            .rev()
            .find(|&pos| boundary.matches(chars, pos))
        {
            return pos;
        }
    }

    hard_end
}

/// Split pages into globally indexed chunks.
///
/// `first_index` is the `chunk_index` of the first emitted chunk; ingest in
/// append mode continues numbering after the existing records.
pub fn split_pages(
    chunker: &dyn Chunker,
    pages: &[Page],
    config: &ChunkingConfig,
    first_index: u64,
) -> DoclensResult<Vec<Chunk>> {
    config.validate()?;

    let mut next_index = first_index;
    let mut chunks = Vec::new();

    for page in pages {
        for raw in chunker.chunk(&page.text, config) {
            chunks.push(Chunk::new(
                raw.content,
                ChunkMetadata {
                    source_path: page.source_path.clone(),
                    page_number: page.page_number,
                    chunk_index: next_index,
                    char_range: raw.char_range,
                },
            ));
            next_index += 1;
        }
    }

    Ok(chunks)
}
