//! Exact nearest-neighbour index over chunk embeddings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::codec;
use super::metric::SimilarityMetric;
use crate::documents::{Chunk, ChunkMetadata};
use crate::error::{DoclensError, DoclensResult, ErrorKind};
use crate::providers::{EmbeddingProvider, with_timeout};
use crate::storage::IndexStorage;

/// Blob name of the persisted index inside a storage location.
pub const INDEX_FILE: &str = "index.vidx";

/// A stored chunk: text and metadata. Its vector lives in the index's
/// contiguous vector buffer at the same position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A search result, most similar first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Immutable-once-published set of embedded chunks.
///
/// All vectors share one dimension. Search is exhaustive, so results are
/// exact for the configured metric.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    metric: SimilarityMetric,
    dimension: usize,
    records: Vec<IndexRecord>,
    /// Row-major, `records.len() * dimension` values.
    vectors: Vec<f32>,
    next_chunk_index: u64,
}

impl VectorIndex {
    /// Create an empty index. Its dimension is fixed by the first insert.
    pub fn new(metric: SimilarityMetric) -> Self {
        Self {
            metric,
            dimension: 0,
            records: Vec::new(),
            vectors: Vec::new(),
            next_chunk_index: 0,
        }
    }

    pub(crate) fn from_parts(
        metric: SimilarityMetric,
        dimension: usize,
        records: Vec<IndexRecord>,
        vectors: Vec<f32>,
        next_chunk_index: u64,
    ) -> Self {
        Self {
            metric,
            dimension,
            records,
            vectors,
            next_chunk_index,
        }
    }

    /// Embed every chunk and build a fresh index.
    ///
    /// `on_progress(done, total)` is called after each embedding. Any
    /// embedding failure aborts the build; no partial index is returned.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        metric: SimilarityMetric,
        request_timeout: Duration,
        on_progress: &mut (dyn FnMut(usize, usize) + Send),
    ) -> DoclensResult<Self> {
        Self::new(metric)
            .extend(chunks, embedder, request_timeout, on_progress)
            .await
    }

    /// Embed `chunks` and return a new index holding this index's records
    /// followed by the new ones. `self` is left untouched.
    pub async fn extend(
        &self,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        request_timeout: Duration,
        on_progress: &mut (dyn FnMut(usize, usize) + Send),
    ) -> DoclensResult<Self> {
        let total = chunks.len();
        let mut next = self.clone();
        next.records.reserve(total);

        for (done, chunk) in chunks.into_iter().enumerate() {
            let vector = with_timeout(
                embedder.name(),
                request_timeout,
                embedder.embed(&chunk.text),
            )
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::ProviderTimeout | ErrorKind::Embedding => e,
                _ => DoclensError::Embedding(format!(
                    "chunk {} (page {}): {e}",
                    chunk.chunk_index(),
                    chunk.page_number()
                )),
            })?;

            next.insert(chunk, vector)?;
            on_progress(done + 1, total);
        }

        tracing::debug!(
            target: "index",
            "embedded {total} chunk(s), index holds {} record(s) of dimension {}",
            next.len(),
            next.dimension
        );

        Ok(next)
    }

    /// Add one embedded chunk.
    ///
    /// The first vector fixes the index dimension; later vectors must match.
    pub fn insert(&mut self, chunk: Chunk, mut vector: Vec<f32>) -> DoclensResult<()> {
        if vector.is_empty() {
            return Err(DoclensError::Embedding(format!(
                "empty embedding for chunk {}",
                chunk.chunk_index()
            )));
        }
        if self.records.is_empty() && self.dimension == 0 {
            self.dimension = vector.len();
        } else if vector.len() != self.dimension {
            return Err(DoclensError::Embedding(format!(
                "inconsistent embedding dimension for chunk {}: expected {}, got {}",
                chunk.chunk_index(),
                self.dimension,
                vector.len()
            )));
        }

        self.metric.prepare(&mut vector);
        self.vectors.extend_from_slice(&vector);
        self.next_chunk_index = self.next_chunk_index.max(chunk.chunk_index() + 1);
        self.records.push(IndexRecord {
            text: chunk.text,
            metadata: chunk.metadata,
        });
        Ok(())
    }

    /// Return the `k` records most similar to `query`, best first.
    ///
    /// Equal scores are ordered by ascending chunk index. An empty index
    /// yields no hits.
    pub fn search(&self, query: &[f32], k: usize) -> DoclensResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(DoclensError::config("k must be at least 1"));
        }
        if self.records.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(DoclensError::config(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut query = query.to_vec();
        self.metric.prepare(&mut query);

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, stored)| (self.metric.score(&query, stored), i))
            .collect();

        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0).then_with(|| {
                self.records[a.1]
                    .metadata
                    .chunk_index
                    .cmp(&self.records[b.1].metadata.chunk_index)
            })
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, i)| {
                let record = &self.records[i];
                SearchHit {
                    text: record.text.clone(),
                    metadata: record.metadata.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Write the index to `storage`, atomically replacing any previous one.
    pub fn persist(&self, storage: &dyn IndexStorage) -> DoclensResult<()> {
        let bytes = codec::encode(self)
            .map_err(|e| DoclensError::storage(storage.location(), std::io::Error::other(e)))?;
        storage
            .write(INDEX_FILE, &bytes)
            .map_err(|e| DoclensError::storage(storage.location(), e))?;

        tracing::debug!(
            target: "index",
            "persisted {} record(s) ({} bytes) to {}",
            self.len(),
            bytes.len(),
            storage.location()
        );
        Ok(())
    }

    /// Read a previously persisted index.
    ///
    /// Fails with `NotFound` if nothing was persisted at the location and
    /// with `CorruptIndex` if the stored data is unreadable.
    pub fn load(storage: &dyn IndexStorage) -> DoclensResult<Self> {
        let location = storage.location();
        let bytes = storage.read(INDEX_FILE).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DoclensError::NotFound {
                    location: location.to_string(),
                }
            } else {
                DoclensError::storage(location, e)
            }
        })?;

        codec::decode(&bytes).map_err(|reason| DoclensError::corrupt(location, reason))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Vector dimension, 0 while the index is empty.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Chunk index the next appended chunk should start from.
    pub fn next_chunk_index(&self) -> u64 {
        self.next_chunk_index
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub(crate) fn vectors(&self) -> &[f32] {
        &self.vectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::path::PathBuf;

    fn chunk(index: u64, text: &str) -> Chunk {
        Chunk::new(
            text.to_string(),
            ChunkMetadata {
                source_path: PathBuf::from("doc.pdf"),
                page_number: 1,
                chunk_index: index,
                char_range: (0, text.len()),
            },
        )
    }

    fn index_of(vectors: &[[f32; 2]]) -> VectorIndex {
        let mut index = VectorIndex::new(SimilarityMetric::Cosine);
        for (i, v) in vectors.iter().enumerate() {
            index
                .insert(chunk(i as u64, &format!("chunk {i}")), v.to_vec())
                .unwrap();
        }
        index
    }

    /// Embeds a text by its length and vowel count.
    struct ShapeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShapeEmbedder {
        fn name(&self) -> &'static str {
            "shape"
        }

        async fn embed(&self, text: &str) -> DoclensResult<Vec<f32>> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32 + 1.0])
        }
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = index_of(&[[1.0, 0.0], [0.0, 1.0], [0.7, 0.7], [0.9, 0.1], [-1.0, 0.0]]);

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.chunk_index, 0);
        assert_eq!(hits[1].metadata.chunk_index, 3);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = index_of(&[[1.0, 0.0], [0.0, 1.0]]);
        assert_eq!(index.search(&[1.0, 1.0], 10).unwrap().len(), 2);
    }

    #[test]
    fn test_ties_break_by_chunk_index() {
        let index = index_of(&[[0.0, 1.0], [1.0, 0.0], [1.0, 0.0], [1.0, 0.0]]);
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let order: Vec<_> = hits.iter().map(|h| h.metadata.chunk_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_search_rejects_bad_input() {
        let index = index_of(&[[1.0, 0.0]]);
        assert_eq!(index.search(&[1.0, 0.0], 0).unwrap_err().kind(), ErrorKind::Config);
        assert_eq!(
            index.search(&[1.0, 0.0, 0.0], 1).unwrap_err().kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_empty_index_search() {
        let index = VectorIndex::new(SimilarityMetric::Cosine);
        assert!(index.search(&[1.0, 2.0, 3.0], 4).unwrap().is_empty());
        assert_eq!(index.dimension(), 0);
    }

    #[test]
    fn test_inconsistent_dimension_rejected() {
        let mut index = index_of(&[[1.0, 0.0]]);
        let err = index.insert(chunk(1, "x"), vec![1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Embedding);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_l2_metric_prefers_nearest() {
        let mut index = VectorIndex::new(SimilarityMetric::L2);
        index.insert(chunk(0, "far"), vec![10.0, 10.0]).unwrap();
        index.insert(chunk(1, "near"), vec![1.0, 1.0]).unwrap();

        let hits = index.search(&[1.0, 1.0], 2).unwrap();
        assert_eq!(hits[0].text, "near");
        assert_eq!(hits[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_build_and_extend() {
        let chunks = vec![chunk(0, "alpha"), chunk(1, "beta gamma")];
        let mut seen = Vec::new();
        let index = VectorIndex::build(
            chunks,
            &ShapeEmbedder,
            SimilarityMetric::Cosine,
            Duration::from_secs(5),
            &mut |done, total| seen.push((done, total)),
        )
        .await
        .unwrap();

        assert_eq!(seen, vec![(1, 2), (2, 2)]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.dimension(), 2);
        assert_eq!(index.next_chunk_index(), 2);

        let extended = index
            .extend(vec![chunk(2, "delta")], &ShapeEmbedder, Duration::from_secs(5), &mut |_, _| {})
            .await
            .unwrap();
        assert_eq!(extended.len(), 3);
        assert_eq!(index.len(), 2);
        assert_eq!(extended.next_chunk_index(), 3);
    }

    #[test]
    fn test_persist_and_load() {
        let storage = MemoryStorage::new("mem://index");
        let index = index_of(&[[1.0, 0.0], [0.6, 0.8]]);

        index.persist(&storage).unwrap();
        let loaded = VectorIndex::load(&storage).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(
            loaded.search(&[0.0, 1.0], 1).unwrap(),
            index.search(&[0.0, 1.0], 1).unwrap()
        );
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let storage = MemoryStorage::new("mem://index");
        assert_eq!(
            VectorIndex::load(&storage).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        storage.write(INDEX_FILE, b"garbage").unwrap();
        assert_eq!(
            VectorIndex::load(&storage).unwrap_err().kind(),
            ErrorKind::CorruptIndex
        );
    }
}
