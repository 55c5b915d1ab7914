//! Ingest command.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use super::engine;
use crate::config::Settings;
use crate::documents::IngestMode;
use crate::rag::{EngineOptions, IngestProgress};

/// Overrides from the command line.
#[derive(Debug, Default)]
pub struct IngestArgs {
    pub path: PathBuf,
    pub mode: Option<IngestMode>,
    pub max_chunk_chars: Option<usize>,
    pub overlap_chars: Option<usize>,
    pub show_progress: bool,
    pub json: bool,
}

pub async fn run(args: IngestArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut options = EngineOptions::from_settings(settings);
    if let Some(mode) = args.mode {
        options.ingest.mode = mode;
    }
    if let Some(max) = args.max_chunk_chars {
        options.ingest.chunking.max_chunk_chars = max;
    }
    if let Some(overlap) = args.overlap_chars {
        options.ingest.chunking.overlap_chars = overlap;
    }
    let ingest_options = options.ingest;

    // Replace never reads the old index; append loads it itself.
    let engine = engine(settings, options)?;

    let bar = if args.show_progress && !args.json {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        bar.set_message(format!("loading {}", args.path.display()));
        Some(bar)
    } else {
        None
    };

    let result = engine
        .ingest_with_progress(&args.path, &ingest_options, |event| {
            let Some(bar) = &bar else { return };
            match event {
                IngestProgress::Loaded { pages } => bar.set_message(format!("{pages} page(s) loaded")),
                IngestProgress::Chunked { chunks } => {
                    bar.set_length(chunks as u64);
                    bar.set_message("embedding");
                }
                IngestProgress::Embedding { done, .. } => bar.set_position(done as u64),
                IngestProgress::Persisted { .. } => bar.set_message("persisted"),
            }
        })
        .await;

    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let report = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} ({} page(s), {} chunk(s), {} ms)",
        style("Ingested").green().bold(),
        report.source_path.display(),
        report.pages,
        report.chunks,
        report.elapsed_ms
    );
    println!(
        "Index at {} now holds {} record(s) [{} mode, dimension {}]",
        engine.location(),
        report.total_records,
        report.mode,
        report.dimension
    );
    Ok(())
}
