//! Owned, in-memory chunk registry.
//!
//! The registry is the single source of truth for ingested chunks within one
//! corpus. It is an explicitly owned store handed to the pipeline rather
//! than process-global state, so multi-tenant and test-isolated instances
//! are cheap. Contents are ephemeral and recomputable from ingestion.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use crate::document::Chunk;

/// Append-mostly registry of all chunks in a corpus.
///
/// Registration is last-write-wins by `chunk_id`, which makes re-ingesting
/// the same chunk idempotent. Readers take an immutable snapshot before
/// deriving anything from the corpus (graph construction in particular), so
/// a registration racing a retrieval never observes a half-updated corpus.
#[derive(Debug, Default)]
pub struct ChunkRegistry {
    chunks: RwLock<BTreeMap<String, Chunk>>,
}

impl ChunkRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register chunks, replacing any existing chunk with the same ID.
    pub async fn register(&self, chunks: &[Chunk]) {
        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.insert(chunk.chunk_id.clone(), chunk.clone());
        }
    }

    /// Take an immutable snapshot of all registered chunks.
    ///
    /// Chunks are returned in `chunk_id` order, so everything derived from a
    /// snapshot iterates deterministically.
    pub async fn snapshot(&self) -> Vec<Chunk> {
        self.chunks.read().await.values().cloned().collect()
    }

    /// Remove all registered chunks.
    pub async fn clear(&self) {
        self.chunks.write().await.clear();
    }

    /// Number of registered chunks.
    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    /// Whether the registry holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            doc_id: "doc".to_string(),
            page_start: 1,
            page_end: 1,
            text: format!("text for {id}"),
            entities: Vec::new(),
        }
    }

    #[tokio::test]
    async fn register_is_idempotent_per_chunk_id() {
        let registry = ChunkRegistry::new();
        registry.register(&[chunk("a"), chunk("b")]).await;
        registry.register(&[chunk("a")]).await;
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn snapshot_is_ordered_by_chunk_id() {
        let registry = ChunkRegistry::new();
        registry.register(&[chunk("b"), chunk("a"), chunk("c")]).await;
        let ids: Vec<String> =
            registry.snapshot().await.into_iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn clear_empties_the_registry() {
        let registry = ChunkRegistry::new();
        registry.register(&[chunk("a")]).await;
        registry.clear().await;
        assert!(registry.is_empty().await);
    }
}
