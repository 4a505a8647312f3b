//! Data types for chunks, scored candidates, and citations.

use serde::{Deserialize, Serialize};

/// An immutable unit of retrievable text with page provenance.
///
/// Chunks are created during ingestion and never mutated afterwards, except
/// for the one-time attachment of extracted `entities`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique, stable identifier for the chunk.
    pub chunk_id: String,
    /// Identifier of the owning document.
    pub doc_id: String,
    /// First page covered by this chunk (inclusive).
    pub page_start: u32,
    /// Last page covered by this chunk (inclusive, `>= page_start`).
    pub page_end: u32,
    /// The cleaned text content of the chunk.
    pub text: String,
    /// Entity strings extracted from the text. May be empty.
    #[serde(default)]
    pub entities: Vec<String>,
}

impl Chunk {
    /// Whether this chunk is usable by the graph and grounding stages.
    ///
    /// Malformed chunks (inverted page bounds or blank text) are skipped by
    /// those stages rather than aborting processing of the remaining chunks.
    pub fn is_well_formed(&self) -> bool {
        self.page_start <= self.page_end && !self.text.trim().is_empty()
    }
}

/// A [`Chunk`] paired with a relevance score.
///
/// The meaning of `score` is stage-dependent: raw cosine similarity, raw
/// BM25 weight, heuristic graph-recall weight, or final reranker score.
/// Scores from different recall pools are min-max normalized before fusion;
/// the reranker overwrites them entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The score (higher is more relevant).
    pub score: f32,
}

/// A grounded, answer-supporting text span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Citation {
    /// First page of the supporting span (inclusive).
    pub page_start: u32,
    /// Last page of the supporting span (inclusive).
    pub page_end: u32,
    /// The supporting sentences, joined with single spaces.
    pub snippet: String,
}

impl Citation {
    /// The exact-duplicate suppression key.
    ///
    /// No two citations in a result list may share this key.
    pub fn key(&self) -> (u32, u32, &str) {
        (self.page_start, self.page_end, self.snippet.as_str())
    }
}
