//! Error types shared across the crate.
//!
//! The taxonomy follows how failures are handled, not where they occur:
//!
//! - Configuration errors ([`DimensionMismatch`](SupportRagError::DimensionMismatch),
//!   [`CountMismatch`](SupportRagError::CountMismatch),
//!   [`Config`](SupportRagError::Config)) are fatal and fail fast — they are
//!   never coerced into degraded results.
//! - [`Embedding`](SupportRagError::Embedding) failures abort the retrieval
//!   that needed them and propagate to the caller.
//! - [`Generation`](SupportRagError::Generation) failures are absorbed at the
//!   orchestrator boundary and converted into an escalation fallback decision.
//! - Storage and serialization failures surface from index persistence.

use thiserror::Error;

/// Result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, SupportRagError>;

#[derive(Debug, Error)]
pub enum SupportRagError {
    /// A vector did not match the index's fixed dimension.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `add` was called with differing document and vector counts.
    #[error("document/vector count mismatch: {documents} documents, {vectors} vectors")]
    CountMismatch { documents: usize, vectors: usize },

    /// Invalid or unusable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The embedding provider failed; the whole batch is rejected.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The generation backend failed or returned an unusable completion.
    #[error("generation backend error: {0}")]
    Generation(String),

    /// Index persistence failed.
    #[error("index storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
