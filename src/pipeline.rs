//! Retrieval pipeline orchestrator.
//!
//! The [`RetrievalPipeline`] coordinates hybrid recall and grounding by
//! composing a [`SemanticRecall`], a [`LexicalRecall`], an
//! [`EntityExtractor`], a [`RelevanceScorer`], and a [`SentenceSimilarity`]
//! over a shared [`ChunkRegistry`].
//!
//! # Example
//!
//! ```rust,ignore
//! use atlas_rag::{RetrievalPipeline, RetrievalConfig, ChunkRegistry};
//!
//! let pipeline = RetrievalPipeline::builder()
//!     .config(RetrievalConfig::default())
//!     .registry(registry)
//!     .semantic_recall(Arc::new(semantic_index))
//!     .lexical_recall(Arc::new(bm25_index))
//!     .entity_extractor(Arc::new(extractor))
//!     .relevance_scorer(Arc::new(cross_scorer))
//!     .sentence_similarity(Arc::new(similarity))
//!     .build()?;
//!
//! let results = pipeline.search("compare X and Y", 5).await?;
//! let citations = pipeline.ground_citations(&answer, &results).await;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RetrievalConfig;
use crate::document::{Citation, ScoredChunk};
use crate::entity::EntityExtractor;
use crate::error::{Result, RetrievalError};
use crate::graph::{EntityGraph, adaptive_hops};
use crate::grounding::CitationGrounder;
use crate::recall::{LexicalRecall, SemanticRecall};
use crate::registry::ChunkRegistry;
use crate::rerank::{PrecisionReranker, select_candidates, sort_descending};
use crate::scorer::{RelevanceScorer, SentenceSimilarity};

/// Shortest entity surface form worth keeping from the extractor.
const MIN_ENTITY_LEN: usize = 3;

/// The hybrid retrieval and grounding orchestrator.
///
/// Request-scoped and stateless across requests, except for the shared
/// chunk registry. The entity graph is rebuilt from a registry snapshot on
/// every search — a deliberate cold-path cost that keeps the graph correct
/// under concurrent ingestion. Construct one via
/// [`RetrievalPipeline::builder()`].
pub struct RetrievalPipeline {
    config: RetrievalConfig,
    registry: Arc<ChunkRegistry>,
    semantic: Arc<dyn SemanticRecall>,
    lexical: Arc<dyn LexicalRecall>,
    entity_extractor: Arc<dyn EntityExtractor>,
    reranker: PrecisionReranker,
    grounder: CitationGrounder,
}

impl std::fmt::Debug for RetrievalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetrievalPipeline {
    /// Create a new [`RetrievalPipelineBuilder`].
    pub fn builder() -> RetrievalPipelineBuilder {
        RetrievalPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Return a reference to the chunk registry.
    pub fn registry(&self) -> &Arc<ChunkRegistry> {
        &self.registry
    }

    /// Hybrid + adaptive graph retrieval.
    ///
    /// Recall is broad and independent of `top_k`: the semantic and lexical
    /// pools are queried concurrently at seed breadth, normalized, and
    /// fused; graph recall then adds chunks related to the query entities
    /// through the co-occurrence graph. `top_k` controls only the final
    /// context size.
    ///
    /// A failing recall channel degrades to an empty pool, and a failing
    /// reranker degrades to the heuristic recall ordering; neither fails
    /// the search. An empty corpus yields `Ok(vec![])`.
    ///
    /// # Errors
    ///
    /// Currently never fails at runtime; the `Result` is part of the caller
    /// contract so collaborator policies can change without breaking it.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        // 1. Broad seed retrieval, both channels concurrently.
        let seed_k = self.config.seed_breadth(top_k);
        let (semantic_hits, lexical_hits) =
            tokio::join!(self.semantic.recall(query, seed_k), self.lexical.recall(query, seed_k));

        let semantic_hits = semantic_hits.unwrap_or_else(|e| {
            warn!(error = %e, "semantic recall unavailable, continuing without it");
            Vec::new()
        });
        let lexical_hits = lexical_hits.unwrap_or_else(|e| {
            warn!(error = %e, "lexical recall unavailable, continuing without it");
            Vec::new()
        });

        // 2. Normalize each pool, then fuse: first-seen order, scores summed
        // for chunks recalled by both channels.
        let mut candidates: Vec<ScoredChunk> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        for sc in normalize_scores(semantic_hits).into_iter().chain(normalize_scores(lexical_hits))
        {
            match by_id.get(&sc.chunk.chunk_id) {
                Some(&index) => candidates[index].score += sc.score,
                None => {
                    by_id.insert(sc.chunk.chunk_id.clone(), candidates.len());
                    candidates.push(sc);
                }
            }
        }

        // 3. Graph recall over the entity co-occurrence graph. This is a
        // non-optional fallback: it still runs when both direct pools came
        // back empty.
        let query_entities = self.query_entities(query);
        let hops = adaptive_hops(query_entities.len(), &self.config);

        if !query_entities.is_empty() {
            let snapshot = self.registry.snapshot().await;
            let graph = EntityGraph::from_chunks(&snapshot);
            let expanded = graph.expand(&query_entities, hops);
            let graph_chunks = graph.chunks_from_entities(&snapshot, &expanded);

            let mut graph_recalled = 0usize;
            for chunk in graph_chunks {
                if by_id.contains_key(&chunk.chunk_id) {
                    continue;
                }
                // Recall score, not ranking score: low enough that directly
                // matched chunks win, scaled by the chunk's entity density.
                let score = self.config.graph_recall_base
                    + self.config.graph_recall_per_entity * chunk.entities.len() as f32;
                by_id.insert(chunk.chunk_id.clone(), candidates.len());
                candidates.push(ScoredChunk { chunk, score });
                graph_recalled += 1;
            }
            info!(
                entity_count = query_entities.len(),
                hops, graph_recalled, "graph recall complete"
            );
        }

        if candidates.is_empty() {
            info!("no candidates from any recall pool");
            return Ok(Vec::new());
        }

        // 4. Precision reranking; scorer failure degrades to the heuristic
        // recall ordering instead of failing the search.
        let results = match self.reranker.rerank(query, &candidates, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "reranker unavailable, falling back to recall ordering");
                sort_descending(&mut candidates);
                select_candidates(query, &candidates, top_k)
            }
        };

        info!(result_count = results.len(), "search completed");
        Ok(results)
    }

    /// Ground a generated answer against its supporting chunks, producing
    /// deduplicated sentence-level citations. See [`CitationGrounder`].
    pub async fn ground_citations(&self, answer: &str, chunks: &[ScoredChunk]) -> Vec<Citation> {
        self.grounder.ground(answer, chunks).await
    }

    /// Extract query entities, falling back to heuristic terms when the
    /// extractor finds nothing: all lowercased whitespace tokens of at least
    /// [`RetrievalConfig::fallback_token_min_len`] characters.
    fn query_entities(&self, query: &str) -> Vec<String> {
        let extracted: BTreeSet<String> = self
            .entity_extractor
            .extract(query)
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| e.chars().count() >= MIN_ENTITY_LEN)
            .collect();

        if !extracted.is_empty() {
            return extracted.into_iter().collect();
        }

        query
            .split_whitespace()
            .filter(|token| token.chars().count() >= self.config.fallback_token_min_len)
            .map(str::to_lowercase)
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }
}

/// Min-max normalize a recall pool's scores to `[0, 1]`.
///
/// Pools score on incompatible scales (cosine similarity vs. BM25 weight),
/// so fusion must never mix them raw. A constant-score pool normalizes to
/// all ones.
fn normalize_scores(mut pool: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    if pool.is_empty() {
        return pool;
    }

    let min = pool.iter().map(|sc| sc.score).fold(f32::INFINITY, f32::min);
    let max = pool.iter().map(|sc| sc.score).fold(f32::NEG_INFINITY, f32::max);

    if (max - min).abs() < f32::EPSILON {
        for sc in &mut pool {
            sc.score = 1.0;
        }
        return pool;
    }

    for sc in &mut pool {
        sc.score = (sc.score - min) / (max - min);
    }
    pool
}

/// Builder for constructing a [`RetrievalPipeline`].
///
/// All collaborators are required; `config` and `registry` default to
/// [`RetrievalConfig::default()`] and a fresh registry when unset.
#[derive(Default)]
pub struct RetrievalPipelineBuilder {
    config: Option<RetrievalConfig>,
    registry: Option<Arc<ChunkRegistry>>,
    semantic: Option<Arc<dyn SemanticRecall>>,
    lexical: Option<Arc<dyn LexicalRecall>>,
    entity_extractor: Option<Arc<dyn EntityExtractor>>,
    relevance_scorer: Option<Arc<dyn RelevanceScorer>>,
    sentence_similarity: Option<Arc<dyn SentenceSimilarity>>,
}

impl RetrievalPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the shared chunk registry.
    pub fn registry(mut self, registry: Arc<ChunkRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the semantic (vector) recall collaborator.
    pub fn semantic_recall(mut self, semantic: Arc<dyn SemanticRecall>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    /// Set the lexical (keyword) recall collaborator.
    pub fn lexical_recall(mut self, lexical: Arc<dyn LexicalRecall>) -> Self {
        self.lexical = Some(lexical);
        self
    }

    /// Set the entity extractor.
    pub fn entity_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.entity_extractor = Some(extractor);
        self
    }

    /// Set the pairwise relevance scorer used by the reranker.
    pub fn relevance_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.relevance_scorer = Some(scorer);
        self
    }

    /// Set the sentence-similarity capability used by citation grounding.
    pub fn sentence_similarity(mut self, similarity: Arc<dyn SentenceSimilarity>) -> Self {
        self.sentence_similarity = Some(similarity);
        self
    }

    /// Build the [`RetrievalPipeline`], validating that all collaborators
    /// are set.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] if any required collaborator is
    /// missing.
    pub fn build(self) -> Result<RetrievalPipeline> {
        let config = self.config.unwrap_or_default();
        let registry = self.registry.unwrap_or_else(|| Arc::new(ChunkRegistry::new()));
        let semantic = self
            .semantic
            .ok_or_else(|| RetrievalError::Config("semantic_recall is required".to_string()))?;
        let lexical = self
            .lexical
            .ok_or_else(|| RetrievalError::Config("lexical_recall is required".to_string()))?;
        let entity_extractor = self
            .entity_extractor
            .ok_or_else(|| RetrievalError::Config("entity_extractor is required".to_string()))?;
        let relevance_scorer = self
            .relevance_scorer
            .ok_or_else(|| RetrievalError::Config("relevance_scorer is required".to_string()))?;
        let sentence_similarity = self.sentence_similarity.ok_or_else(|| {
            RetrievalError::Config("sentence_similarity is required".to_string())
        })?;

        let reranker = PrecisionReranker::new(relevance_scorer);
        let grounder = CitationGrounder::new(sentence_similarity, &config);

        Ok(RetrievalPipeline {
            config,
            registry,
            semantic,
            lexical,
            entity_extractor,
            reranker,
            grounder,
        })
    }
}
