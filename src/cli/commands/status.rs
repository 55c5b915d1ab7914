//! Status command.

use console::style;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::Settings;
use crate::error::DoclensError;
use crate::storage::{FsStorage, IndexStorage};
use crate::vector::{SimilarityMetric, VectorIndex};

#[derive(Debug, Serialize)]
struct IndexStatus {
    location: String,
    state: &'static str,
    records: usize,
    dimension: usize,
    metric: Option<SimilarityMetric>,
    sources: Vec<String>,
    detail: Option<String>,
}

pub fn run(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let storage = FsStorage::new(settings.resolved_index_path());
    let status = inspect(&storage);

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", style("Index Status:").cyan().bold());
    println!("  Location:  {}", status.location);
    println!("  State:     {}", status.state);
    if let Some(metric) = status.metric {
        println!("  Records:   {}", status.records);
        println!("  Dimension: {}", status.dimension);
        println!("  Metric:    {metric}");
    }
    if !status.sources.is_empty() {
        println!("  Sources:");
        for source in &status.sources {
            println!("    - {source}");
        }
    }
    if let Some(detail) = &status.detail {
        println!("  Detail:    {}", style(detail).red());
    }
    Ok(())
}

fn inspect(storage: &dyn IndexStorage) -> IndexStatus {
    let mut status = IndexStatus {
        location: storage.location().to_string(),
        state: "empty",
        records: 0,
        dimension: 0,
        metric: None,
        sources: Vec::new(),
        detail: None,
    };

    match VectorIndex::load(storage) {
        Ok(index) => {
            let sources: BTreeSet<String> = index
                .records()
                .iter()
                .map(|r| r.metadata.source_path.display().to_string())
                .collect();
            status.state = "ready";
            status.records = index.len();
            status.dimension = index.dimension();
            status.metric = Some(index.metric());
            status.sources = sources.into_iter().collect();
        }
        Err(DoclensError::NotFound { .. }) => {}
        Err(e) => {
            status.state = "unreadable";
            status.detail = Some(e.to_string());
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::vector::INDEX_FILE;

    #[test]
    fn test_inspect_states() {
        let storage = MemoryStorage::new("mem://status");
        assert_eq!(inspect(&storage).state, "empty");

        VectorIndex::new(SimilarityMetric::Cosine)
            .persist(&storage)
            .unwrap();
        let status = inspect(&storage);
        assert_eq!(status.state, "ready");
        assert_eq!(status.records, 0);

        storage.write(INDEX_FILE, b"junk").unwrap();
        let status = inspect(&storage);
        assert_eq!(status.state, "unreadable");
        assert!(status.detail.is_some());
    }
}
