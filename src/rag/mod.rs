//! Retrieval-augmented question answering over ingested documents.

mod engine;
mod locks;
mod prompt;

pub use engine::{
    Answer, EngineOptions, EngineState, IngestOptions, IngestProgress, IngestReport, QueryEngine,
};
pub use locks::LocationLocks;
pub use prompt::build_prompt;
