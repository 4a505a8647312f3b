//! Entity co-occurrence graph and entity → chunk index.
//!
//! Nodes are case-normalized entity surface forms. An undirected edge links
//! two entities whenever they co-occur in the same chunk, weighted by the
//! co-occurrence count across the corpus. The graph is derived data: it is
//! rebuilt from a chunk snapshot and never persisted.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::RetrievalConfig;
use crate::document::Chunk;

/// Normalize an entity surface form into its node identity.
pub(crate) fn normalize_entity(entity: &str) -> String {
    entity.trim().to_lowercase()
}

/// Entity co-occurrence graph plus the entity → chunk-id index.
///
/// Construction is deterministic: edge weights are co-occurrence counters,
/// so the order chunks are processed in cannot affect the final graph.
#[derive(Debug, Default)]
pub struct EntityGraph {
    /// entity → set of chunk IDs containing it.
    entity_chunks: HashMap<String, HashSet<String>>,
    /// entity → (neighbor → co-occurrence weight). Undirected: every edge
    /// is stored from both endpoints. No self-loops.
    adjacency: HashMap<String, HashMap<String, u32>>,
}

impl EntityGraph {
    /// Build the graph and index from a chunk snapshot.
    ///
    /// Malformed chunks contribute nothing. An empty corpus yields an empty
    /// graph on which every operation degrades to a no-op.
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let mut graph = Self::default();
        graph.index_entities(chunks);
        for chunk in chunks {
            graph.link_cooccurrences(chunk);
        }
        graph
    }

    /// Add each chunk's ID to the chunk set of every entity it carries.
    ///
    /// Idempotent per chunk: re-indexing the same chunk is a set insertion
    /// no-op.
    pub fn index_entities(&mut self, chunks: &[Chunk]) {
        for chunk in chunks {
            if !chunk.is_well_formed() {
                continue;
            }
            for entity in &chunk.entities {
                self.entity_chunks
                    .entry(normalize_entity(entity))
                    .or_default()
                    .insert(chunk.chunk_id.clone());
            }
        }
    }

    /// Increment the edge weight for every distinct entity pair in `chunk`.
    fn link_cooccurrences(&mut self, chunk: &Chunk) {
        if !chunk.is_well_formed() {
            return;
        }
        // Deduplicate after normalization so "Rust" and "rust" become one
        // node instead of a self-loop.
        let entities: BTreeSet<String> =
            chunk.entities.iter().map(|e| normalize_entity(e)).collect();
        let entities: Vec<&String> = entities.iter().collect();

        for entity in &entities {
            self.adjacency.entry((*entity).clone()).or_default();
        }
        for (i, a) in entities.iter().enumerate() {
            for b in &entities[i + 1..] {
                *self
                    .adjacency
                    .entry((*a).clone())
                    .or_default()
                    .entry((*b).clone())
                    .or_insert(0) += 1;
                *self
                    .adjacency
                    .entry((*b).clone())
                    .or_default()
                    .entry((*a).clone())
                    .or_insert(0) += 1;
            }
        }
    }

    /// Breadth-first entity expansion.
    ///
    /// `hops = 0` returns the normalized seeds unchanged; each additional
    /// hop unions in all graph neighbors of the currently-expanded set.
    /// Exactly `hops` iterations run regardless of convergence; plateauing
    /// early is allowed. Entities absent from the graph are skipped.
    pub fn expand<I, S>(&self, seeds: I, hops: usize) -> HashSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut expanded: HashSet<String> =
            seeds.into_iter().map(|s| normalize_entity(s.as_ref())).collect();

        for _ in 0..hops {
            let mut neighbors: HashSet<String> = HashSet::new();
            for entity in &expanded {
                if let Some(adjacent) = self.adjacency.get(entity) {
                    neighbors.extend(adjacent.keys().cloned());
                }
            }
            expanded.extend(neighbors);
        }

        expanded
    }

    /// Recall every chunk whose ID appears in the union of the entity →
    /// chunk sets for `entities`. Recall only: no ranking is applied, and
    /// chunks with no matching entity are excluded.
    pub fn chunks_from_entities(&self, chunks: &[Chunk], entities: &HashSet<String>) -> Vec<Chunk> {
        let mut matched_ids: HashSet<&str> = HashSet::new();
        for entity in entities {
            if let Some(chunk_ids) = self.entity_chunks.get(&normalize_entity(entity)) {
                matched_ids.extend(chunk_ids.iter().map(String::as_str));
            }
        }

        chunks.iter().filter(|c| matched_ids.contains(c.chunk_id.as_str())).cloned().collect()
    }

    /// Co-occurrence weight of the edge between two entities, if any.
    pub fn edge_weight(&self, a: &str, b: &str) -> Option<u32> {
        self.adjacency.get(&normalize_entity(a))?.get(&normalize_entity(b)).copied()
    }

    /// Number of entity nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }
}

/// Graph expansion depth policy.
///
/// More query entities raise confidence that expansion will stay on-topic,
/// justifying deeper traversal:
///
/// - `0` entities → 0 hops (graph recall disabled upstream)
/// - `1` entity → [`RetrievalConfig::single_entity_hops`] (default 0:
///   exact-entity recall only, too ambiguous to expand usefully)
/// - `2..=3` entities → 1 hop
/// - `>= 4` entities → 2 hops
pub fn adaptive_hops(num_query_entities: usize, config: &RetrievalConfig) -> usize {
    match num_query_entities {
        0 => 0,
        1 => config.single_entity_hops,
        2..=3 => 1,
        _ => 2,
    }
}
