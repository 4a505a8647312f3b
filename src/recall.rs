//! Recall traits for the semantic and lexical candidate pools.
//!
//! The two channels are logically independent and are queried concurrently
//! by the pipeline. A failing channel degrades to an empty pool rather than
//! failing the whole search.

use async_trait::async_trait;

use crate::document::ScoredChunk;
use crate::error::Result;

/// Nearest-neighbor search over a vector index keyed by chunk identity.
///
/// Scores are raw similarity values; the pipeline normalizes them before
/// fusing with other pools.
#[async_trait]
pub trait SemanticRecall: Send + Sync {
    /// Return the `k` chunks most semantically similar to `query`.
    async fn recall(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Term-frequency scored keyword search over the same chunk corpus.
///
/// Implementations return only chunks with a nonzero score.
#[async_trait]
pub trait LexicalRecall: Send + Sync {
    /// Return up to `k` keyword matches for `query`, best first.
    async fn recall(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;
}
