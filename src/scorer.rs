//! Scorer traits for reranking and citation grounding.

use std::sync::Arc;

use async_trait::async_trait;

use crate::embedding::{EmbeddingProvider, cosine_similarity};
use crate::error::Result;

/// A query-aware pairwise relevance scorer used by the reranker.
///
/// Given `(query, chunk text)`, returns a real-valued relevance score;
/// larger is better. Implementations can wrap cross-encoder models,
/// LLM-based scoring, or other strategies to improve precision beyond
/// initial recall similarity.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score the relevance of `text` to `query`.
    async fn score(&self, query: &str, text: &str) -> Result<f32>;

    /// Score a batch of texts against the same query.
    ///
    /// The default implementation calls [`score`](RelevanceScorer::score)
    /// sequentially; backends with native pair batching should override it.
    async fn score_batch(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(texts.len());
        for text in texts {
            scores.push(self.score(query, text).await?);
        }
        Ok(scores)
    }
}

/// Cosine-style semantic similarity between an answer and a candidate
/// sentence, used by the citation grounding filter.
///
/// Values follow normalized-embedding cosine semantics, conceptually in
/// `[-1.0, 1.0]`.
#[async_trait]
pub trait SentenceSimilarity: Send + Sync {
    /// Similarity between the whole answer text and one sentence.
    async fn similarity(&self, answer: &str, sentence: &str) -> Result<f32>;

    /// Similarity between the answer and each of `sentences`.
    ///
    /// The default implementation calls
    /// [`similarity`](SentenceSimilarity::similarity) sequentially.
    async fn similarity_batch(&self, answer: &str, sentences: &[&str]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(sentences.len());
        for sentence in sentences {
            scores.push(self.similarity(answer, sentence).await?);
        }
        Ok(scores)
    }
}

/// A [`SentenceSimilarity`] backed by an [`EmbeddingProvider`].
///
/// Embeds both sides and compares them with cosine similarity. The batch
/// form embeds the answer once and the sentences as one batch.
pub struct EmbeddingSimilarity {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingSimilarity {
    /// Create a new `EmbeddingSimilarity` over the given provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SentenceSimilarity for EmbeddingSimilarity {
    async fn similarity(&self, answer: &str, sentence: &str) -> Result<f32> {
        let answer_embedding = self.provider.embed(answer).await?;
        let sentence_embedding = self.provider.embed(sentence).await?;
        Ok(cosine_similarity(&answer_embedding, &sentence_embedding))
    }

    async fn similarity_batch(&self, answer: &str, sentences: &[&str]) -> Result<Vec<f32>> {
        let answer_embedding = self.provider.embed(answer).await?;
        let sentence_embeddings = self.provider.embed_batch(sentences).await?;
        Ok(sentence_embeddings
            .iter()
            .map(|embedding| cosine_similarity(&answer_embedding, embedding))
            .collect())
    }
}
