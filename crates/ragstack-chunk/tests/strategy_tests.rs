use ragstack_chunk::ChunkingStrategy;
use ragstack_core::types::{ChunkingParams, Document};

fn four_paragraph_document() -> Document {
    let paragraph = |tag: &str| {
        let mut p = String::new();
        while p.chars().count() < 780 {
            p.push_str(&format!("This is sentence material for the {tag} section of the report. "));
        }
        p.trim_end().to_string()
    };
    let text = ["alpha", "bravo", "charlie", "delta", "echo"].map(paragraph).join("\n\n");
    Document::new("report", text).with_title("Report").with_source("/tmp/report.txt")
}

fn assert_contiguous(chunks: &[ragstack_core::types::Chunk]) {
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.ordinal, i, "ordinals are gap-free");
        assert!(!c.text.trim().is_empty(), "chunk text is never blank");
        assert_eq!(c.doc_id, "report");
    }
}

#[test]
fn every_strategy_is_deterministic() {
    let doc = four_paragraph_document();
    let params = ChunkingParams::default();
    for strategy in ChunkingStrategy::ALL {
        let a = strategy.chunk(&doc, &params);
        let b = strategy.chunk(&doc, &params);
        assert_eq!(a, b, "{strategy} must be deterministic");
        assert!(!a.is_empty());
        assert_contiguous(&a);
    }
}

#[test]
fn every_strategy_returns_nothing_for_blank_input() {
    let params = ChunkingParams::default();
    for strategy in ChunkingStrategy::ALL {
        assert!(strategy.chunk(&Document::new("e", ""), &params).is_empty());
        assert!(strategy.chunk(&Document::new("w", " \n\n \t"), &params).is_empty());
    }
}

#[test]
fn adaptive_picks_paragraphs_for_structured_text() {
    let doc = four_paragraph_document();
    assert!(doc.text.chars().count() >= 3900);
    let chunks = ChunkingStrategy::Adaptive.chunk(&doc, &ChunkingParams::default());

    assert_eq!(chunks.len(), 5, "one chunk per paragraph");
    for c in &chunks {
        assert_eq!(c.metadata["strategy"], "adaptive");
        assert_eq!(c.metadata["delegate"], "paragraph");
        assert!(c.metadata.get("position").is_none(), "not sliding-window output");
    }
    assert!(chunks[0].text.contains("alpha"));
    assert!(chunks[4].text.contains("echo"));
}

#[test]
fn adaptive_keeps_short_document_whole() {
    let doc = Document::new("d", "  Hi there ");
    let params = ChunkingParams { sentence_min_len: 20, ..ChunkingParams::default() };
    let chunks = ChunkingStrategy::Adaptive.chunk(&doc, &params);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Hi there");
    assert!(chunks[0].metadata.get("delegate").is_none());
}

#[test]
fn adaptive_splits_chunks_above_the_token_ceiling() {
    let words = |n: usize| vec!["lorem ipsum dolor sit amet"; n].join(" ");
    let text = format!("{}\n\n{}", words(300), words(277));
    assert!(text.chars().count() >= 15_000);
    let doc = Document::new("report", text);
    let params = ChunkingParams::default();
    let ceiling = params.max_tokens * 4;

    let chunks = ChunkingStrategy::Adaptive.chunk(&doc, &params);
    assert!(chunks.len() >= 8);
    for c in &chunks {
        assert!(c.text.chars().count() <= ceiling, "chunk {} has {} chars", c.ordinal, c.text.chars().count());
    }
    assert_contiguous(&chunks);
    let ids: std::collections::HashSet<_> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), chunks.len());
}

#[test]
fn sentence_merges_short_sentences_forward() {
    let doc = Document::new("d", "Yes. The committee approved the budget. No. It was close.");
    let params = ChunkingParams { language: "en".into(), sentence_min_len: 10, ..ChunkingParams::default() };
    let texts: Vec<String> = ChunkingStrategy::Sentence.chunk(&doc, &params).into_iter().map(|c| c.text).collect();
    assert_eq!(texts, vec!["Yes. The committee approved the budget.", "No. It was close."]);
}

#[test]
fn paragraph_merges_short_paragraphs_with_next() {
    let doc = Document::new("d", "Title\n\nA body paragraph that is definitely long enough to stand alone.\n\nEnd");
    let params = ChunkingParams { paragraph_min_len: 20, ..ChunkingParams::default() };
    let texts: Vec<String> = ChunkingStrategy::Paragraph.chunk(&doc, &params).into_iter().map(|c| c.text).collect();
    assert_eq!(
        texts,
        vec!["Title\n\nA body paragraph that is definitely long enough to stand alone.\n\nEnd".to_string()]
    );
}

#[test]
fn sliding_window_geometry() {
    let text: String = "abcdefghij".repeat(10);
    let doc = Document::new("d", text);
    let params = ChunkingParams { window_size: 30, overlap: 10, ..ChunkingParams::default() };
    let chunks = ChunkingStrategy::SlidingWindow.chunk(&doc, &params);

    let starts: Vec<u64> = chunks.iter().map(|c| c.metadata["position"].as_u64().unwrap()).collect();
    assert_eq!(starts, vec![0, 20, 40, 60, 80]);
    assert!(chunks.iter().all(|c| c.text.chars().count() <= 30));
    assert_eq!(chunks.last().unwrap().text.chars().count(), 20);
}

#[test]
fn sliding_windows_end_on_word_boundaries() {
    let doc = Document::new("d", "one two three four five six seven eight nine ten");
    let params = ChunkingParams { window_size: 20, overlap: 8, ..ChunkingParams::default() };
    let texts: Vec<String> = ChunkingStrategy::SlidingWindow.chunk(&doc, &params).into_iter().map(|c| c.text).collect();
    // Starts advance by 12; every window but the last is cut back to a space.
    assert_eq!(texts, vec!["one two three four", "e four five six", "six seven eight", "ght nine ten"]);

    let exact = ChunkingStrategy::Overlap.chunk(&doc, &ChunkingParams { max_tokens: 20, overlap: 8, ..params });
    assert_eq!(exact[0].text, "one two three four f", "simple_overlap never snaps");
}

#[test]
fn overlap_strategy_sizes_windows_by_max_tokens() {
    let doc = Document::new("d", "x".repeat(250));
    let params = ChunkingParams { max_tokens: 100, overlap: 20, window_size: 1000, ..ChunkingParams::default() };
    let chunks = ChunkingStrategy::Overlap.chunk(&doc, &params);
    let lens: Vec<usize> = chunks.iter().map(|c| c.text.len()).collect();
    assert_eq!(lens, vec![100, 100, 90]);
}

#[test]
fn chunk_ids_are_unique_per_document() {
    let doc = four_paragraph_document();
    let chunks = ChunkingStrategy::SlidingWindow.chunk(&doc, &ChunkingParams::default());
    let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), chunks.len());
    assert_eq!(chunks[0].id, "report:0");
}

#[test]
fn unknown_strategy_name_is_validation_error() {
    let err = "semantic".parse::<ChunkingStrategy>().unwrap_err();
    assert!(err.is_validation());
    assert_eq!("Sliding_Window".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::SlidingWindow);
    assert_eq!("simple_overlap".parse::<ChunkingStrategy>().unwrap(), ChunkingStrategy::Overlap);
}
