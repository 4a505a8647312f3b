//! Configuration for the retrieval pipeline.
//!
//! All tuning knobs live here as named, overridable values rather than
//! literals embedded in algorithm code. The defaults are the empirically
//! chosen reference values; none of them is a load-bearing invariant.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Configuration parameters for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Multiplier applied to `top_k` when computing recall seed breadth.
    pub seed_multiplier: usize,
    /// Lower bound on recall seed breadth regardless of `top_k`.
    pub min_seed_k: usize,
    /// Graph expansion depth for single-entity queries.
    ///
    /// `0` means exact-entity recall only (the default: one entity is too
    /// ambiguous to expand usefully); `1` enables direct-neighbor expansion.
    pub single_entity_hops: usize,
    /// Minimum token length for the fallback query-term heuristic used when
    /// entity extraction finds nothing.
    pub fallback_token_min_len: usize,
    /// Base heuristic score assigned to graph-recalled chunks.
    pub graph_recall_base: f32,
    /// Per-entity bonus added to the graph-recall score, rewarding
    /// entity-dense chunks.
    pub graph_recall_per_entity: f32,
    /// Minimum answer-to-sentence similarity for a sentence to count as
    /// supporting evidence.
    pub citation_threshold: f32,
    /// Maximum supporting sentences collected per chunk.
    pub max_sentences_per_chunk: usize,
    /// Sentences shorter than this (in characters, after trimming) are too
    /// short to be meaningful evidence and are discarded.
    pub min_sentence_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            seed_multiplier: 4,
            min_seed_k: 8,
            single_entity_hops: 0,
            fallback_token_min_len: 4,
            graph_recall_base: 0.20,
            graph_recall_per_entity: 0.05,
            citation_threshold: 0.45,
            max_sentences_per_chunk: 2,
            min_sentence_len: 20,
        }
    }
}

impl RetrievalConfig {
    /// Create a new builder for constructing a [`RetrievalConfig`].
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }

    /// Recall seed breadth for a given `top_k`.
    ///
    /// Recall breadth is intentionally decoupled from `top_k` so the graph,
    /// lexical, and semantic signals have enough material to disagree before
    /// truncation: `max(top_k * seed_multiplier, min_seed_k)`.
    pub fn seed_breadth(&self, top_k: usize) -> usize {
        (top_k * self.seed_multiplier).max(self.min_seed_k)
    }
}

/// Builder for constructing a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    /// Set the seed breadth multiplier.
    pub fn seed_multiplier(mut self, multiplier: usize) -> Self {
        self.config.seed_multiplier = multiplier;
        self
    }

    /// Set the minimum recall seed breadth.
    pub fn min_seed_k(mut self, min: usize) -> Self {
        self.config.min_seed_k = min;
        self
    }

    /// Set the expansion depth used for single-entity queries (0 or 1).
    pub fn single_entity_hops(mut self, hops: usize) -> Self {
        self.config.single_entity_hops = hops;
        self
    }

    /// Set the minimum token length for fallback query terms.
    pub fn fallback_token_min_len(mut self, len: usize) -> Self {
        self.config.fallback_token_min_len = len;
        self
    }

    /// Set the base heuristic score for graph-recalled chunks.
    pub fn graph_recall_base(mut self, base: f32) -> Self {
        self.config.graph_recall_base = base;
        self
    }

    /// Set the per-entity bonus for graph-recalled chunks.
    pub fn graph_recall_per_entity(mut self, bonus: f32) -> Self {
        self.config.graph_recall_per_entity = bonus;
        self
    }

    /// Set the citation similarity threshold.
    pub fn citation_threshold(mut self, threshold: f32) -> Self {
        self.config.citation_threshold = threshold;
        self
    }

    /// Set the per-chunk supporting sentence cap.
    pub fn max_sentences_per_chunk(mut self, max: usize) -> Self {
        self.config.max_sentences_per_chunk = max;
        self
    }

    /// Set the minimum supporting sentence length.
    pub fn min_sentence_len(mut self, len: usize) -> Self {
        self.config.min_sentence_len = len;
        self
    }

    /// Build the [`RetrievalConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] if:
    /// - `seed_multiplier == 0` or `min_seed_k == 0`
    /// - `single_entity_hops > 1`
    /// - `citation_threshold` is outside `[-1.0, 1.0]`
    /// - `max_sentences_per_chunk == 0`
    pub fn build(self) -> Result<RetrievalConfig> {
        let config = self.config;
        if config.seed_multiplier == 0 {
            return Err(RetrievalError::Config(
                "seed_multiplier must be greater than zero".to_string(),
            ));
        }
        if config.min_seed_k == 0 {
            return Err(RetrievalError::Config("min_seed_k must be greater than zero".to_string()));
        }
        if config.single_entity_hops > 1 {
            return Err(RetrievalError::Config(format!(
                "single_entity_hops ({}) must be 0 or 1",
                config.single_entity_hops
            )));
        }
        if !(-1.0..=1.0).contains(&config.citation_threshold) {
            return Err(RetrievalError::Config(format!(
                "citation_threshold ({}) must be within [-1.0, 1.0]",
                config.citation_threshold
            )));
        }
        if config.max_sentences_per_chunk == 0 {
            return Err(RetrievalError::Config(
                "max_sentences_per_chunk must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = RetrievalConfig::builder().build().unwrap();
        assert_eq!(config, RetrievalConfig::default());
    }

    #[test]
    fn seed_breadth_honors_multiplier_and_floor() {
        let config = RetrievalConfig::default();
        assert_eq!(config.seed_breadth(1), 8);
        assert_eq!(config.seed_breadth(2), 8);
        assert_eq!(config.seed_breadth(3), 12);
        assert_eq!(config.seed_breadth(10), 40);
    }

    #[test]
    fn rejects_zero_seed_multiplier() {
        let err = RetrievalConfig::builder().seed_multiplier(0).build().unwrap_err();
        assert!(err.to_string().contains("seed_multiplier"));
    }

    #[test]
    fn rejects_deep_single_entity_hops() {
        let err = RetrievalConfig::builder().single_entity_hops(2).build().unwrap_err();
        assert!(err.to_string().contains("single_entity_hops"));
    }

    #[test]
    fn rejects_out_of_range_citation_threshold() {
        let err = RetrievalConfig::builder().citation_threshold(1.5).build().unwrap_err();
        assert!(err.to_string().contains("citation_threshold"));
    }

    #[test]
    fn single_entity_hops_of_one_is_allowed() {
        let config = RetrievalConfig::builder().single_entity_hops(1).build().unwrap();
        assert_eq!(config.single_entity_hops, 1);
    }
}
