//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod ingest;
pub mod init;
pub mod query;
pub mod status;

use std::sync::Arc;

use crate::config::Settings;
use crate::providers;
use crate::rag::{EngineOptions, QueryEngine};
use crate::storage::FsStorage;

/// Build an engine for the configured index location without reading it.
pub(crate) fn engine(settings: &Settings, options: EngineOptions) -> anyhow::Result<QueryEngine> {
    let providers = providers::from_settings(settings)?;
    let storage = Arc::new(FsStorage::new(settings.resolved_index_path()));
    Ok(QueryEngine::new(
        providers.embedder,
        providers.llm,
        storage,
        options,
    ))
}

/// Open the engine with the persisted index loaded.
pub(crate) async fn open_engine(
    settings: &Settings,
    options: EngineOptions,
) -> anyhow::Result<QueryEngine> {
    let engine = engine(settings, options)?;
    engine.reload().await?;
    Ok(engine)
}
