//! Prompt assembly for answer synthesis.

use crate::vector::SearchHit;

const PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Build the completion prompt: instructions, retrieved chunk texts in
/// rank order, then the question.
pub fn build_prompt(question: &str, hits: &[SearchHit]) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::ChunkMetadata;
    use std::path::PathBuf;

    fn hit(text: &str, index: u64) -> SearchHit {
        SearchHit {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source_path: PathBuf::from("a.pdf"),
                page_number: 1,
                chunk_index: index,
                char_range: (0, text.len()),
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_prompt_keeps_rank_order() {
        let prompt = build_prompt(
            "What is the warranty period?",
            &[hit("second best", 3), hit("runner up", 1)],
        );

        let first = prompt.find("second best").unwrap();
        let second = prompt.find("runner up").unwrap();
        assert!(first < second);
        assert!(prompt.contains("second best\n\nrunner up"));
        assert!(prompt.ends_with("Question: What is the warranty period?\nHelpful Answer:"));
        assert!(prompt.starts_with("Use the following pieces of context"));
    }
}
