//! Query and Search commands.

use console::style;

use super::open_engine;
use crate::config::Settings;
use crate::rag::EngineOptions;
use crate::vector::SearchHit;

const PREVIEW_CHARS: usize = 160;

/// Run query command - answer a question with the language model.
pub async fn run_query(
    question: &str,
    top_k: Option<usize>,
    show_sources: bool,
    json: bool,
    settings: &Settings,
) -> anyhow::Result<()> {
    let mut options = EngineOptions::from_settings(settings);
    if let Some(k) = top_k {
        options.top_k = k;
    }

    let engine = open_engine(settings, options).await?;
    let answer = engine.query(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.text);
    if show_sources {
        println!();
        println!("{}", style("Sources:").cyan().bold());
        print_hits(&answer.sources);
    }
    Ok(())
}

/// Run search command - retrieval only, no model call.
pub async fn run_search(
    query: &str,
    limit: usize,
    json: bool,
    settings: &Settings,
) -> anyhow::Result<()> {
    let engine = open_engine(settings, EngineOptions::from_settings(settings)).await?;
    let hits = engine.retrieve(query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        eprintln!("No results found.");
    } else {
        print_hits(&hits);
    }
    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "\n{}. {} p.{} #{} (score: {:.3})",
            i + 1,
            hit.metadata.source_path.display(),
            hit.metadata.page_number,
            hit.metadata.chunk_index,
            hit.score
        );
        println!("   {}", style(preview(&hit.text)).dim());
    }
}

fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &flat[..end]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("a\n\nb   c"), "a b c");
        let long = "x".repeat(PREVIEW_CHARS + 10);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }
}
