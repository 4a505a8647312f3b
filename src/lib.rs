//! # atlas-rag
//!
//! Adaptive hybrid retrieval, reranking, and citation grounding for
//! question-answering applications.
//!
//! ## Overview
//!
//! The crate fuses three recall signals over a corpus of ingested document
//! chunks — vector similarity, keyword (BM25) search, and entity
//! co-occurrence graph traversal — then reranks the fused pool with a
//! query-aware scorer and filters answer citations down to the sentences
//! that actually support a generated answer.
//!
//! - [`RetrievalPipeline`] — the orchestrator: `search` and
//!   `ground_citations` entry points
//! - [`EntityGraph`] — entity → chunk index and weighted co-occurrence
//!   graph with adaptive-depth expansion
//! - [`PrecisionReranker`] — pairwise rescoring with comparison-safe
//!   selection for contrastive queries
//! - [`CitationGrounder`] — sentence-level grounding with deduplicated
//!   citations
//!
//! External capabilities (embeddings, recall channels, NER, relevance and
//! similarity scoring) are injected behind single-method traits, so the
//! pipeline runs against anything from production services to the bundled
//! in-memory implementations ([`InMemorySemanticIndex`], [`Bm25Index`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use atlas_rag::{
//!     Bm25Index, ChunkRegistry, InMemorySemanticIndex, RetrievalPipeline,
//! };
//!
//! let registry = Arc::new(ChunkRegistry::new());
//! registry.register(&chunks).await;
//!
//! let pipeline = RetrievalPipeline::builder()
//!     .registry(registry)
//!     .semantic_recall(semantic)
//!     .lexical_recall(lexical)
//!     .entity_extractor(extractor)
//!     .relevance_scorer(scorer)
//!     .sentence_similarity(similarity)
//!     .build()?;
//!
//! let results = pipeline.search("compare X and Y", 5).await?;
//! let citations = pipeline.ground_citations(&answer, &results).await;
//! ```
//!
//! ## Failure policy
//!
//! Collaborator failures are degraded at the point of use: a recall channel
//! that errors contributes an empty pool, a failing reranker falls back to
//! the heuristic recall ordering, and a failing similarity scorer drops
//! only the affected chunk from grounding. Only configuration errors
//! surface from the builders.

pub mod config;
pub mod document;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod graph;
pub mod grounding;
pub mod inmemory;
pub mod pipeline;
pub mod recall;
pub mod registry;
pub mod rerank;
pub mod scorer;

pub use config::{RetrievalConfig, RetrievalConfigBuilder};
pub use document::{Chunk, Citation, ScoredChunk};
pub use embedding::{EmbeddingProvider, cosine_similarity};
pub use entity::{EntityExtractor, NoOpEntityExtractor};
pub use error::{Result, RetrievalError};
pub use graph::{EntityGraph, adaptive_hops};
pub use grounding::CitationGrounder;
pub use inmemory::{Bm25Index, InMemorySemanticIndex};
pub use pipeline::{RetrievalPipeline, RetrievalPipelineBuilder};
pub use recall::{LexicalRecall, SemanticRecall};
pub use registry::ChunkRegistry;
pub use rerank::{PrecisionReranker, is_comparison_query};
pub use scorer::{EmbeddingSimilarity, RelevanceScorer, SentenceSimilarity};
