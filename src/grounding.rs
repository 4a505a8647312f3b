//! Sentence-level citation grounding.
//!
//! Given a generated answer and its supporting chunks, keeps only the
//! sentences that are semantically close to the answer, so citations carry
//! the minimal evidence instead of whole chunks.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RetrievalConfig;
use crate::document::{Citation, ScoredChunk};
use crate::scorer::SentenceSimilarity;

/// Filters supporting chunks down to answer-supporting sentences.
pub struct CitationGrounder {
    similarity: Arc<dyn SentenceSimilarity>,
    citation_threshold: f32,
    max_sentences_per_chunk: usize,
    min_sentence_len: usize,
}

impl CitationGrounder {
    /// Create a new grounder over the given sentence-similarity capability.
    pub fn new(similarity: Arc<dyn SentenceSimilarity>, config: &RetrievalConfig) -> Self {
        Self {
            similarity,
            citation_threshold: config.citation_threshold,
            max_sentences_per_chunk: config.max_sentences_per_chunk,
            min_sentence_len: config.min_sentence_len,
        }
    }

    /// Ground `answer` against its supporting chunks.
    ///
    /// Per chunk, sentences whose similarity to the whole answer meets the
    /// threshold are collected in original order up to the per-chunk cap and
    /// joined into one snippet. Chunks yielding no accepted sentence
    /// contribute no citation. The result is deduplicated by exact
    /// `(page_start, page_end, snippet)` key, preserving first-seen order.
    ///
    /// A blank answer short-circuits to an empty list. Malformed chunks are
    /// skipped, and a chunk whose similarity call fails is dropped with a
    /// warning rather than failing the whole grounding pass.
    pub async fn ground(&self, answer: &str, chunks: &[ScoredChunk]) -> Vec<Citation> {
        if answer.trim().is_empty() {
            return Vec::new();
        }

        let mut citations: Vec<Citation> = Vec::new();
        let mut seen: HashSet<(u32, u32, String)> = HashSet::new();

        for sc in chunks {
            if !sc.chunk.is_well_formed() {
                continue;
            }

            let sentences = split_sentences(&sc.chunk.text, self.min_sentence_len);
            if sentences.is_empty() {
                continue;
            }

            let sentence_refs: Vec<&str> = sentences.iter().map(String::as_str).collect();
            let similarities = match self.similarity.similarity_batch(answer, &sentence_refs).await
            {
                Ok(similarities) => similarities,
                Err(e) => {
                    warn!(chunk_id = %sc.chunk.chunk_id, error = %e, "sentence similarity failed, skipping chunk");
                    continue;
                }
            };

            let mut selected: Vec<&str> = Vec::new();
            for (sentence, similarity) in sentences.iter().zip(similarities) {
                if similarity >= self.citation_threshold {
                    selected.push(sentence);
                }
                if selected.len() >= self.max_sentences_per_chunk {
                    break;
                }
            }

            if selected.is_empty() {
                continue;
            }

            let snippet = selected.join(" ");
            let key = (sc.chunk.page_start, sc.chunk.page_end, snippet.clone());
            if seen.insert(key) {
                citations.push(Citation {
                    page_start: sc.chunk.page_start,
                    page_end: sc.chunk.page_end,
                    snippet,
                });
            }
        }

        info!(citation_count = citations.len(), "grounded citations");
        citations
    }
}

/// Split text into sentences on terminal punctuation followed by whitespace,
/// keeping the punctuation attached. Fragments shorter than `min_len`
/// characters after trimming are discarded as too short to be evidence.
fn split_sentences(text: &str, min_len: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?')
            && chars.peek().is_none_or(|next| next.is_whitespace())
        {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            push_sentence(&mut sentences, &current, min_len);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current, min_len);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str, min_len: usize) {
    let trimmed = raw.trim();
    if trimmed.chars().count() >= min_len {
        sentences.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::document::Chunk;
    use crate::error::{Result, RetrievalError};

    fn scored(id: &str, text: &str, page_start: u32, page_end: u32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                chunk_id: id.to_string(),
                doc_id: "doc".to_string(),
                page_start,
                page_end,
                text: text.to_string(),
                entities: Vec::new(),
            },
            score: 1.0,
        }
    }

    /// Similarity driven by a marker word: sentences containing "relevant"
    /// score 0.9, everything else 0.1.
    struct MarkerSimilarity;

    #[async_trait]
    impl SentenceSimilarity for MarkerSimilarity {
        async fn similarity(&self, _answer: &str, sentence: &str) -> Result<f32> {
            Ok(if sentence.contains("relevant") { 0.9 } else { 0.1 })
        }
    }

    struct FailingSimilarity;

    #[async_trait]
    impl SentenceSimilarity for FailingSimilarity {
        async fn similarity(&self, _answer: &str, _sentence: &str) -> Result<f32> {
            Err(RetrievalError::Scorer {
                scorer: "failing".to_string(),
                message: "down".to_string(),
            })
        }
    }

    fn grounder(similarity: Arc<dyn SentenceSimilarity>) -> CitationGrounder {
        CitationGrounder::new(similarity, &RetrievalConfig::default())
    }

    #[test]
    fn split_keeps_punctuation_and_drops_short_fragments() {
        let sentences = split_sentences(
            "Short one. This sentence is clearly long enough! Is this one also long enough? Tiny.",
            20,
        );
        assert_eq!(
            sentences,
            vec![
                "This sentence is clearly long enough!",
                "Is this one also long enough?",
            ],
        );
    }

    #[test]
    fn split_handles_text_without_terminal_punctuation() {
        let sentences = split_sentences("a trailing fragment with no terminator at all", 20);
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn split_does_not_break_inside_ellipsis_or_decimals() {
        let sentences =
            split_sentences("Version 2.5 of the model shipped today with many fixes.", 20);
        assert_eq!(sentences.len(), 1);
    }

    #[tokio::test]
    async fn blank_answer_short_circuits() {
        let grounder = grounder(Arc::new(MarkerSimilarity));
        let chunks =
            vec![scored("a", "This sentence is relevant to the answer indeed.", 1, 2)];
        assert!(grounder.ground("   ", &chunks).await.is_empty());
        assert!(grounder.ground("", &chunks).await.is_empty());
    }

    #[tokio::test]
    async fn keeps_only_sentences_above_threshold() {
        let grounder = grounder(Arc::new(MarkerSimilarity));
        let text = "This sentence is relevant to the answer. This other sentence talks about the weather today.";
        let citations = grounder.ground("the answer", &[scored("a", text, 3, 4)]).await;
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].snippet, "This sentence is relevant to the answer.");
        assert_eq!((citations[0].page_start, citations[0].page_end), (3, 4));
    }

    #[tokio::test]
    async fn caps_sentences_per_chunk_and_joins_with_spaces() {
        let grounder = grounder(Arc::new(MarkerSimilarity));
        let text = "First relevant sentence right here. Second relevant sentence right here. Third relevant sentence right here.";
        let citations = grounder.ground("answer", &[scored("a", text, 1, 1)]).await;
        assert_eq!(
            citations[0].snippet,
            "First relevant sentence right here. Second relevant sentence right here.",
        );
    }

    #[tokio::test]
    async fn chunk_with_no_supporting_sentence_contributes_nothing() {
        let grounder = grounder(Arc::new(MarkerSimilarity));
        let citations = grounder
            .ground("answer", &[scored("a", "Nothing about the topic in this chunk at all.", 1, 1)])
            .await;
        assert!(citations.is_empty());
    }

    #[tokio::test]
    async fn identical_evidence_spans_appear_once() {
        let grounder = grounder(Arc::new(MarkerSimilarity));
        let text = "This overlapping sentence is relevant evidence.";
        let chunks = vec![scored("a", text, 2, 2), scored("b", text, 2, 2)];
        let citations = grounder.ground("answer", &chunks).await;
        assert_eq!(citations.len(), 1);
    }

    #[tokio::test]
    async fn malformed_chunk_is_skipped() {
        let grounder = grounder(Arc::new(MarkerSimilarity));
        let mut bad = scored("bad", "This sentence would have been relevant enough.", 5, 5);
        bad.chunk.page_start = 9;
        bad.chunk.page_end = 3;
        let good = scored("good", "This good sentence is relevant to the answer.", 1, 1);
        let citations = grounder.ground("answer", &[bad, good]).await;
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].page_start, 1);
    }

    #[tokio::test]
    async fn similarity_failure_degrades_to_skipping_the_chunk() {
        let grounder = grounder(Arc::new(FailingSimilarity));
        let chunks = vec![scored("a", "A sentence that is long enough to qualify.", 1, 1)];
        assert!(grounder.ground("answer", &chunks).await.is_empty());
    }
}
