//! Entity extraction trait.

/// Deterministic, label-filtered named-entity / noun-phrase extraction.
///
/// Implementations wrap an NER model or a simpler heuristic. Extraction is
/// synchronous and deterministic: the same text always yields the same
/// entity set.
pub trait EntityExtractor: Send + Sync {
    /// Extract entity strings from `text`. May return an empty list; the
    /// pipeline then falls back to heuristic query terms.
    fn extract(&self, text: &str) -> Vec<String>;
}

/// An extractor that never finds entities.
///
/// Useful when no NER model is available; the pipeline's fallback term
/// heuristic takes over.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEntityExtractor;

impl EntityExtractor for NoOpEntityExtractor {
    fn extract(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}
