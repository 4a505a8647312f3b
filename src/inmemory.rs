//! In-memory recall collaborators.
//!
//! This module provides reference implementations of the two recall
//! channels, suitable for development, testing, and small-scale use:
//!
//! - [`InMemorySemanticIndex`] — cosine-similarity search over embeddings
//!   held in a `HashMap` behind a `tokio::sync::RwLock`
//! - [`Bm25Index`] — Okapi BM25 keyword search over the same corpus

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, ScoredChunk};
use crate::embedding::{EmbeddingProvider, cosine_similarity};
use crate::error::Result;
use crate::recall::{LexicalRecall, SemanticRecall};

/// An in-memory semantic index using cosine similarity for search.
///
/// Chunks are embedded through the injected [`EmbeddingProvider`] at index
/// time; queries are embedded at recall time and compared against every
/// stored vector.
pub struct InMemorySemanticIndex {
    provider: Arc<dyn EmbeddingProvider>,
    entries: RwLock<BTreeMap<String, (Chunk, Vec<f32>)>>,
}

impl InMemorySemanticIndex {
    /// Create a new empty index over the given embedding provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider, entries: RwLock::new(BTreeMap::new()) }
    }

    /// Embed and index chunks, replacing entries with the same `chunk_id`.
    ///
    /// # Errors
    ///
    /// Returns the embedding provider's error if batch embedding fails.
    pub async fn index_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;

        let mut entries = self.entries.write().await;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            entries.insert(chunk.chunk_id.clone(), (chunk.clone(), embedding));
        }
        Ok(())
    }

    /// Remove all indexed chunks.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl SemanticRecall for InMemorySemanticIndex {
    async fn recall(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.provider.embed(query).await?;

        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredChunk> = entries
            .values()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(embedding, &query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Okapi BM25 parameters (standard values).
const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

/// A keyword-scored document in the BM25 index.
struct Bm25Doc {
    chunk: Chunk,
    term_freq: HashMap<String, u32>,
    len: f32,
}

#[derive(Default)]
struct Bm25State {
    docs: Vec<Bm25Doc>,
    doc_freq: HashMap<String, u32>,
    total_len: f32,
}

/// An in-memory Okapi BM25 keyword index.
///
/// Tokenization is lowercase whitespace splitting; scoring uses the
/// standard BM25 formula with `k1 = 1.2`, `b = 0.75`. Only chunks with a
/// positive score are returned.
#[derive(Default)]
pub struct Bm25Index {
    state: RwLock<Bm25State>,
}

impl Bm25Index {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from the given chunks.
    pub async fn index_chunks(&self, chunks: &[Chunk]) {
        let mut state = Bm25State::default();
        for chunk in chunks {
            let tokens = tokenize(&chunk.text);
            let mut term_freq: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freq.keys() {
                *state.doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            state.total_len += tokens.len() as f32;
            state.docs.push(Bm25Doc { chunk: chunk.clone(), term_freq, len: tokens.len() as f32 });
        }
        *self.state.write().await = state;
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

fn bm25_score(state: &Bm25State, doc: &Bm25Doc, query_terms: &[String]) -> f32 {
    let total_docs = state.docs.len() as f32;
    let avg_len = if state.docs.is_empty() { 0.0 } else { state.total_len / total_docs };

    let mut score = 0.0;
    for term in query_terms {
        let Some(&tf) = doc.term_freq.get(term) else { continue };
        let df = *state.doc_freq.get(term).unwrap_or(&0) as f32;
        let idf = ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln();
        let tf = tf as f32;
        let denom = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc.len / avg_len.max(1e-6));
        score += idf * (tf * (BM25_K1 + 1.0)) / denom;
    }
    score
}

#[async_trait]
impl LexicalRecall for Bm25Index {
    async fn recall(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let state = self.state.read().await;
        if state.docs.is_empty() {
            return Ok(Vec::new());
        }

        let query_terms = tokenize(query);
        let mut scored: Vec<ScoredChunk> = state
            .docs
            .iter()
            .filter_map(|doc| {
                let score = bm25_score(&state, doc, &query_terms);
                (score > 0.0).then(|| ScoredChunk { chunk: doc.chunk.clone(), score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
