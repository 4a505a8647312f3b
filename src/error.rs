//! Error types for the `atlas-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A recall collaborator (semantic or lexical) failed.
    #[error("Recall error ({channel}): {message}")]
    Recall {
        /// The recall channel that produced the error (`"semantic"` or `"lexical"`).
        channel: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A relevance or similarity scorer failed.
    #[error("Scorer error ({scorer}): {message}")]
    Scorer {
        /// The scorer that produced the error.
        scorer: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error in the retrieval pipeline orchestration.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
