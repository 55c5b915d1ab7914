//! Chunking properties over arbitrary page text.

use doclens::documents::{Chunker, SlidingWindowChunker, split_pages};
use doclens::{ChunkingConfig, Page};
use proptest::prelude::*;

fn config_strategy() -> impl Strategy<Value = ChunkingConfig> {
    (2usize..200).prop_flat_map(|max| (Just(max), 0..max))
        .prop_map(|(max, overlap)| ChunkingConfig::new(max, overlap))
}

proptest! {
    #[test]
    fn chunks_cover_page_without_gaps(
        text in "[a-zA-Z .!?\n]{0,800}",
        config in config_strategy(),
    ) {
        let chars: Vec<char> = text.chars().collect();
        let chunks = SlidingWindowChunker.chunk(&text, &config);

        if chars.is_empty() {
            prop_assert!(chunks.is_empty());
            return Ok(());
        }

        prop_assert_eq!(chunks[0].char_range.0, 0);
        prop_assert_eq!(chunks.last().unwrap().char_range.1, chars.len());

        // Concatenating chunks minus their overlaps rebuilds the page
        let mut rebuilt = String::new();
        let mut covered = 0;
        for chunk in &chunks {
            let (start, end) = chunk.char_range;
            prop_assert!(start <= covered, "gap before {start}");
            prop_assert!(end > covered, "chunk adds nothing");
            prop_assert!(end - start <= config.max_chunk_chars);

            let expected: String = chars[start..end].iter().collect();
            prop_assert_eq!(&chunk.content, &expected);

            rebuilt.extend(&chars[covered..end]);
            covered = end;
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn hard_cuts_overlap_exactly(
        len in 1usize..2000,
        config in config_strategy(),
    ) {
        // No whitespace or punctuation, so every cut is a hard cut
        let text: String = (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let chunks = SlidingWindowChunker.chunk(&text, &config);

        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            prop_assert_eq!(prev.char_range.1 - prev.char_range.0, config.max_chunk_chars);
            prop_assert_eq!(prev.char_range.1 - next.char_range.0, config.overlap_chars);
        }
    }

    #[test]
    fn chunking_is_deterministic(text in ".{0,400}", config in config_strategy()) {
        let a = SlidingWindowChunker.chunk(&text, &config);
        let b = SlidingWindowChunker.chunk(&text, &config);
        prop_assert_eq!(a, b);
    }
}

#[test]
fn two_page_document_chunk_layout() {
    let pages = vec![
        Page::new("A".repeat(2500), 1, "doc.pdf"),
        Page::new("B".repeat(800), 2, "doc.pdf"),
    ];

    let chunks = split_pages(
        &SlidingWindowChunker,
        &pages,
        &ChunkingConfig::new(1000, 100),
        0,
    )
    .unwrap();

    assert_eq!(chunks.len(), 4);

    let page_one: Vec<_> = chunks.iter().filter(|c| c.page_number() == 1).collect();
    assert_eq!(page_one.len(), 3);
    assert_eq!(
        page_one.iter().map(|c| c.metadata.char_range).collect::<Vec<_>>(),
        vec![(0, 1000), (900, 1900), (1800, 2500)]
    );

    assert_eq!(chunks[3].page_number(), 2);
    assert_eq!(chunks[3].text, "B".repeat(800));

    let indices: Vec<_> = chunks.iter().map(|c| c.chunk_index()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}
