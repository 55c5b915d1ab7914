//! Vector index: embedded chunks with exact top-k similarity search and
//! single-file persistence.

mod codec;
mod index;
mod metric;

pub use index::{INDEX_FILE, IndexRecord, SearchHit, VectorIndex};
pub use metric::{SimilarityMetric, cosine_similarity, l2_normalize};
