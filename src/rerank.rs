//! Precision reranking and comparison-safe candidate selection.
//!
//! The reranker assigns every fused candidate a fresh score from a
//! query-aware pairwise scorer, then selects the final set. For queries that
//! signal a contrast, naive top-K truncation can collapse onto one side of
//! the comparison if that side scores uniformly higher; selection therefore
//! switches to a diversity-preserving mode that keeps at least two chunks
//! and one representative per entity cluster.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::document::ScoredChunk;
use crate::error::Result;
use crate::graph::normalize_entity;
use crate::scorer::RelevanceScorer;

/// Contrastive markers that switch selection into comparison-safe mode.
///
/// Matched by substring against the lowercased query.
const COMPARISON_MARKERS: [&str; 6] =
    ["difference", "different", "compare", "comparison", "vs", "versus"];

/// Whether the query signals a multi-entity contrast.
pub fn is_comparison_query(query: &str) -> bool {
    let lowered = query.to_lowercase();
    COMPARISON_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Reranks fused candidates with a pairwise relevance scorer.
pub struct PrecisionReranker {
    scorer: Arc<dyn RelevanceScorer>,
}

impl PrecisionReranker {
    /// Create a new reranker over the given scorer.
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { scorer }
    }

    /// Rerank `candidates` and select at most `max(top_k, 2)` of them.
    ///
    /// Every candidate receives a fresh score from the scorer, completely
    /// overwriting whatever the recall stage assigned — rerank scores are
    /// never blended with recall scores. Candidates are then stable-sorted
    /// descending (ties keep recall order, so behavior is deterministic)
    /// and handed to [`select_candidates`].
    ///
    /// Empty input yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns the scorer's error unchanged; the pipeline catches it and
    /// falls back to the pre-rerank heuristic ordering.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: &[ScoredChunk],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates.iter().map(|sc| sc.chunk.text.as_str()).collect();
        let scores = self.scorer.score_batch(query, &texts).await?;

        let mut rescored: Vec<ScoredChunk> = candidates
            .iter()
            .zip(scores)
            .map(|(sc, score)| ScoredChunk { chunk: sc.chunk.clone(), score })
            .collect();
        sort_descending(&mut rescored);

        debug!(candidate_count = rescored.len(), "reranked candidates");

        Ok(select_candidates(query, &rescored, top_k))
    }
}

/// Stable descending sort by score; ties keep their existing order.
pub(crate) fn sort_descending(candidates: &mut [ScoredChunk]) {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Select the final candidate list from a score-ordered slice.
///
/// Non-comparison queries get plain chunk-id-deduplicating truncation to
/// `top_k`. Comparison queries get the diversity-preserving walk: one chunk
/// per entity cluster first, remaining quota filled by score order, at least
/// `max(top_k, 2)` unique chunks kept whenever that many exist.
pub(crate) fn select_candidates(
    query: &str,
    ranked: &[ScoredChunk],
    top_k: usize,
) -> Vec<ScoredChunk> {
    if !is_comparison_query(query) {
        let mut seen_ids: HashSet<&str> = HashSet::new();
        return ranked
            .iter()
            .filter(|sc| seen_ids.insert(sc.chunk.chunk_id.as_str()))
            .take(top_k)
            .cloned()
            .collect();
    }

    let limit = top_k.max(2);
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_clusters: HashSet<String> = HashSet::new();
    let mut selected: Vec<ScoredChunk> = Vec::new();

    // First pass: one chunk per entity cluster, so both sides of the
    // comparison survive even when one side scores uniformly higher.
    for sc in ranked {
        if selected.len() >= limit {
            break;
        }
        if seen_ids.contains(&sc.chunk.chunk_id) {
            continue;
        }
        // Entity-less chunks have no cluster to collide with.
        if let Some(fingerprint) = entity_fingerprint(sc) {
            if !seen_clusters.insert(fingerprint) {
                continue;
            }
        }
        seen_ids.insert(sc.chunk.chunk_id.clone());
        selected.push(sc.clone());
    }

    // Second pass: fill any remaining quota by score order.
    for sc in ranked {
        if selected.len() >= limit {
            break;
        }
        if seen_ids.insert(sc.chunk.chunk_id.clone()) {
            selected.push(sc.clone());
        }
    }

    sort_descending(&mut selected);
    selected
}

/// Case-normalized, order-insensitive entity signature of a chunk.
fn entity_fingerprint(sc: &ScoredChunk) -> Option<String> {
    if sc.chunk.entities.is_empty() {
        return None;
    }
    let mut normalized: Vec<String> =
        sc.chunk.entities.iter().map(|e| normalize_entity(e)).collect();
    normalized.sort();
    normalized.dedup();
    Some(normalized.join("\u{1f}"))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::document::Chunk;
    use crate::error::RetrievalError;

    fn candidate(id: &str, entities: &[&str], score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                chunk_id: id.to_string(),
                doc_id: "doc".to_string(),
                page_start: 1,
                page_end: 1,
                text: format!("text {id}"),
                entities: entities.iter().map(|e| e.to_string()).collect(),
            },
            score,
        }
    }

    /// Scores each text by a fixed table keyed on the candidate's text.
    struct TableScorer(Vec<(String, f32)>);

    #[async_trait]
    impl RelevanceScorer for TableScorer {
        async fn score(&self, _query: &str, text: &str) -> Result<f32> {
            Ok(self.0.iter().find(|(t, _)| t == text).map(|(_, s)| *s).unwrap_or(0.0))
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl RelevanceScorer for FailingScorer {
        async fn score(&self, _query: &str, _text: &str) -> Result<f32> {
            Err(RetrievalError::Scorer {
                scorer: "failing".to_string(),
                message: "down".to_string(),
            })
        }
    }

    #[test]
    fn detects_comparison_markers() {
        assert!(is_comparison_query("compare transformers and RNNs"));
        assert!(is_comparison_query("X VS Y"));
        assert!(is_comparison_query("what is the DIFFERENCE here"));
        assert!(!is_comparison_query("what is a transformer"));
    }

    #[test]
    fn non_comparison_selection_truncates_to_top_k() {
        let ranked = vec![
            candidate("a", &[], 0.9),
            candidate("b", &[], 0.8),
            candidate("c", &[], 0.7),
        ];
        let selected = select_candidates("what is a?", &ranked, 2);
        let ids: Vec<&str> = selected.iter().map(|sc| sc.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn comparison_selection_keeps_both_sides() {
        // Both top scorers come from the same entity cluster; the lower
        // scorer from the other side must survive truncation.
        let ranked = vec![
            candidate("a", &["transformer"], 0.9),
            candidate("b", &["transformer"], 0.85),
            candidate("c", &["recurrent-network"], 0.5),
        ];
        let selected =
            select_candidates("compare transformer and recurrent network", &ranked, 2);
        let ids: Vec<&str> = selected.iter().map(|sc| sc.chunk.chunk_id.as_str()).collect();
        assert!(ids.contains(&"c"), "expected the other side to survive, got {ids:?}");
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn comparison_selection_fills_quota_after_diversity_pass() {
        let ranked = vec![
            candidate("a", &["transformer"], 0.9),
            candidate("b", &["transformer"], 0.85),
            candidate("c", &["recurrent-network"], 0.5),
        ];
        let selected =
            select_candidates("compare transformer and recurrent network", &ranked, 3);
        let ids: Vec<&str> = selected.iter().map(|sc| sc.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn comparison_selection_keeps_at_least_two_even_for_top_k_one() {
        let ranked = vec![
            candidate("a", &["transformer"], 0.9),
            candidate("c", &["recurrent-network"], 0.5),
        ];
        let selected = select_candidates("a vs c", &ranked, 1);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn comparison_selection_output_is_score_ordered() {
        let ranked = vec![
            candidate("a", &["x"], 0.9),
            candidate("b", &["x"], 0.85),
            candidate("c", &["y"], 0.5),
        ];
        let selected = select_candidates("x versus y", &ranked, 3);
        for window in selected.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[tokio::test]
    async fn rerank_overwrites_recall_scores() {
        let reranker = PrecisionReranker::new(Arc::new(TableScorer(vec![
            ("text a".to_string(), 0.1),
            ("text b".to_string(), 0.9),
        ])));
        let candidates = vec![candidate("a", &[], 5.0), candidate("b", &[], 0.01)];
        let reranked = reranker.rerank("what is b?", &candidates, 2).await.unwrap();
        assert_eq!(reranked[0].chunk.chunk_id, "b");
        assert!((reranked[0].score - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn rerank_of_empty_candidates_is_empty() {
        let reranker = PrecisionReranker::new(Arc::new(TableScorer(Vec::new())));
        let reranked = reranker.rerank("anything", &[], 3).await.unwrap();
        assert!(reranked.is_empty());
    }

    #[tokio::test]
    async fn rerank_propagates_scorer_failure() {
        let reranker = PrecisionReranker::new(Arc::new(FailingScorer));
        let candidates = vec![candidate("a", &[], 1.0)];
        assert!(reranker.rerank("q", &candidates, 1).await.is_err());
    }
}
