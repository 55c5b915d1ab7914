//! The query engine: ingest documents into a persisted vector index and
//! answer questions against the live snapshot.

use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::locks::LocationLocks;
use super::prompt::build_prompt;
use crate::config::Settings;
use crate::documents::{self, Chunker, ChunkingConfig, IngestMode, SlidingWindowChunker};
use crate::error::{DoclensError, DoclensResult, ErrorKind, QueryStage};
use crate::providers::{EmbeddingProvider, LanguageModel, with_timeout};
use crate::storage::IndexStorage;
use crate::vector::{SearchHit, SimilarityMetric, VectorIndex};
use crate::{debug_event, log_event};

/// Engine-wide settings that do not change between requests.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Metric for indexes built from scratch.
    pub metric: SimilarityMetric,
    /// Deadline for each provider call.
    pub request_timeout: Duration,
    /// Defaults for [`QueryEngine::ingest`].
    pub ingest: IngestOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            metric: SimilarityMetric::default(),
            request_timeout: Duration::from_secs(120),
            ingest: IngestOptions::default(),
        }
    }
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            top_k: settings.retrieval.top_k,
            metric: settings.retrieval.metric,
            request_timeout: settings.providers.request_timeout(),
            ingest: IngestOptions {
                chunking: settings.documents.chunking(),
                mode: settings.documents.mode,
            },
        }
    }
}

/// Per-ingest parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    pub chunking: ChunkingConfig,
    pub mode: IngestMode,
}

/// Lifecycle of the live index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// No index; queries fail with `NotReady`.
    Empty,
    /// A snapshot is live.
    Ready,
}

/// Progress events emitted while ingesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestProgress {
    Loaded { pages: usize },
    Chunked { chunks: usize },
    Embedding { done: usize, total: usize },
    Persisted { records: usize },
}

/// Summary of a successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source_path: PathBuf,
    pub mode: String,
    pub pages: usize,
    /// Chunks produced from this document.
    pub chunks: usize,
    /// Records in the index after the ingest.
    pub total_records: usize,
    pub dimension: usize,
    pub elapsed_ms: u64,
}

/// A model answer with the chunks it was given.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchHit>,
}

/// Handle owning the live index snapshot.
///
/// Queries bind the current snapshot when they start and keep it for their
/// whole run; a concurrent ingest swaps in a new snapshot only after it has
/// been persisted.
pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LanguageModel>,
    storage: Arc<dyn IndexStorage>,
    chunker: Box<dyn Chunker>,
    locks: Arc<LocationLocks>,
    options: EngineOptions,
    snapshot: RwLock<Option<Arc<VectorIndex>>>,
}

impl QueryEngine {
    /// Create an engine in the `Empty` state.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
        storage: Arc<dyn IndexStorage>,
        options: EngineOptions,
    ) -> Self {
        Self {
            embedder,
            llm,
            storage,
            chunker: Box::new(SlidingWindowChunker),
            locks: LocationLocks::global(),
            options,
            snapshot: RwLock::new(None),
        }
    }

    /// Create an engine and load the index persisted in `storage`, if any.
    ///
    /// A missing index leaves the engine `Empty`; a corrupt one is an error.
    pub async fn open(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
        storage: Arc<dyn IndexStorage>,
        options: EngineOptions,
    ) -> DoclensResult<Self> {
        let engine = Self::new(embedder, llm, storage, options);
        engine.reload().await?;
        Ok(engine)
    }

    /// Replace the chunking strategy.
    pub fn with_chunker(mut self, chunker: Box<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    /// Use a private lock table instead of the process-wide one.
    pub fn with_locks(mut self, locks: Arc<LocationLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Re-read the persisted index into the live snapshot.
    pub async fn reload(&self) -> DoclensResult<EngineState> {
        match self.load_persisted().await {
            Ok(index) => {
                debug_event!(
                    "index",
                    "loaded",
                    "{} record(s) from {}",
                    index.len(),
                    self.storage.location()
                );
                *self.snapshot.write() = Some(Arc::new(index));
                Ok(EngineState::Ready)
            }
            Err(DoclensError::NotFound { .. }) => Ok(self.state()),
            Err(e) => Err(e),
        }
    }

    pub fn state(&self) -> EngineState {
        if self.snapshot.read().is_some() {
            EngineState::Ready
        } else {
            EngineState::Empty
        }
    }

    /// Current snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<VectorIndex>> {
        self.snapshot.read().clone()
    }

    /// Drop the live snapshot. Storage is left untouched.
    pub fn reset(&self) {
        *self.snapshot.write() = None;
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Storage location this engine persists to.
    pub fn location(&self) -> &str {
        self.storage.location()
    }

    /// Ingest a document with the engine's default options.
    pub async fn ingest_default(&self, path: impl AsRef<Path>) -> DoclensResult<IngestReport> {
        let options = self.options.ingest;
        self.ingest(path, &options).await
    }

    /// Load, chunk, embed and persist a document, then publish the result.
    pub async fn ingest(
        &self,
        path: impl AsRef<Path>,
        options: &IngestOptions,
    ) -> DoclensResult<IngestReport> {
        self.ingest_with_progress(path, options, |_| {}).await
    }

    /// [`ingest`](Self::ingest) reporting progress through `on_progress`.
    ///
    /// On any failure the persisted index and the live snapshot are exactly
    /// as they were before the call.
    pub async fn ingest_with_progress<F>(
        &self,
        path: impl AsRef<Path>,
        options: &IngestOptions,
        mut on_progress: F,
    ) -> DoclensResult<IngestReport>
    where
        F: FnMut(IngestProgress) + Send,
    {
        options.chunking.validate()?;
        let _guard = self.locks.try_acquire(self.storage.location())?;

        let started = Instant::now();
        let path = path.as_ref().to_path_buf();
        log_event!("ingest", "started", "{} ({})", path.display(), options.mode);

        let document = {
            let source = path.clone();
            tokio::task::spawn_blocking(move || documents::load(source))
                .await
                .map_err(|e| DoclensError::load(&path, format!("loader task failed: {e}")))??
        };
        if document.is_blank() {
            return Err(DoclensError::load(
                &path,
                "document contains no extractable text",
            ));
        }
        on_progress(IngestProgress::Loaded {
            pages: document.page_count(),
        });

        let base = match options.mode {
            IngestMode::Replace => VectorIndex::new(self.options.metric),
            IngestMode::Append => self.append_base().await?,
        };

        let chunks = documents::split_pages(
            self.chunker.as_ref(),
            document.pages(),
            &options.chunking,
            base.next_chunk_index(),
        )?;
        let chunk_count = chunks.len();
        on_progress(IngestProgress::Chunked {
            chunks: chunk_count,
        });

        let index = base
            .extend(
                chunks,
                self.embedder.as_ref(),
                self.options.request_timeout,
                &mut |done, total| on_progress(IngestProgress::Embedding { done, total }),
            )
            .await?;
        let index = Arc::new(index);

        {
            let index = Arc::clone(&index);
            let storage = Arc::clone(&self.storage);
            tokio::task::spawn_blocking(move || index.persist(storage.as_ref()))
                .await
                .map_err(|e| {
                    DoclensError::storage(
                        self.storage.location(),
                        std::io::Error::other(format!("persist task failed: {e}")),
                    )
                })??;
        }
        on_progress(IngestProgress::Persisted {
            records: index.len(),
        });

        *self.snapshot.write() = Some(Arc::clone(&index));

        let report = IngestReport {
            source_path: path,
            mode: options.mode.to_string(),
            pages: document.page_count(),
            chunks: chunk_count,
            total_records: index.len(),
            dimension: index.dimension(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        log_event!(
            "ingest",
            "completed",
            "{} page(s), {} chunk(s), {} record(s) live in {}ms",
            report.pages,
            report.chunks,
            report.total_records,
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Answer a question from the live snapshot.
    pub async fn query(&self, question: &str) -> DoclensResult<Answer> {
        let index = self.snapshot().ok_or(DoclensError::NotReady)?;
        let started = Instant::now();

        let sources = self
            .retrieve_from(&index, question, self.options.top_k)
            .await?;

        let prompt = build_prompt(question, &sources);
        let text = with_timeout(
            self.llm.name(),
            self.options.request_timeout,
            self.llm.complete(&prompt),
        )
        .await
        .map_err(|e| e.at_stage(QueryStage::Complete))?;

        log_event!(
            "query",
            "answered",
            "{} source(s) in {}ms",
            sources.len(),
            started.elapsed().as_millis()
        );
        Ok(Answer { text, sources })
    }

    /// Retrieve the `k` chunks most similar to `question` without calling
    /// the language model.
    pub async fn retrieve(&self, question: &str, k: usize) -> DoclensResult<Vec<SearchHit>> {
        let index = self.snapshot().ok_or(DoclensError::NotReady)?;
        self.retrieve_from(&index, question, k).await
    }

    async fn retrieve_from(
        &self,
        index: &VectorIndex,
        question: &str,
        k: usize,
    ) -> DoclensResult<Vec<SearchHit>> {
        if question.trim().is_empty() {
            return Err(DoclensError::config("question must not be empty"));
        }
        if k == 0 {
            return Err(DoclensError::config("k must be at least 1"));
        }

        let embedding = with_timeout(
            self.embedder.name(),
            self.options.request_timeout,
            self.embedder.embed(question),
        )
        .await
        .map_err(|e| e.at_stage(QueryStage::Embed))?;

        let hits = index
            .search(&embedding, k)
            .map_err(|e| e.at_stage(QueryStage::Search))?;

        debug_event!("query", "retrieved", "{} hit(s) for k={k}", hits.len());
        Ok(hits)
    }

    /// Index an append extends: the live snapshot, else whatever is
    /// persisted, else nothing.
    async fn append_base(&self) -> DoclensResult<VectorIndex> {
        if let Some(index) = self.snapshot() {
            return Ok(index.as_ref().clone());
        }
        match self.load_persisted().await {
            Ok(index) => Ok(index),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(VectorIndex::new(self.options.metric)),
            Err(e) => Err(e),
        }
    }

    async fn load_persisted(&self) -> DoclensResult<VectorIndex> {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || VectorIndex::load(storage.as_ref()))
            .await
            .map_err(|e| {
                DoclensError::storage(
                    self.storage.location(),
                    std::io::Error::other(format!("load task failed: {e}")),
                )
            })?
    }
}
