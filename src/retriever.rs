//! # Retriever
//!
//! Query-time API over the vector index: embed a natural-language query,
//! search the index, hand back scored documents. Also owns batch ingestion,
//! the only path that mutates the index.
//!
//! The index is the one piece of shared mutable state in the pipeline, so it
//! sits behind a `tokio::sync::RwLock`: ingestion takes the write lock
//! (single writer), searches take read locks. A search running concurrently
//! with an ingest observes either the pre-add or the post-add index as a
//! whole, never a half-appended state.
//!
//! Embedding failures propagate — there is no meaningful answer to "find
//! similar documents" without the ability to embed the query.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, SupportRagError};
use crate::models::{Document, ScoredDocument};
use crate::vector_index::VectorIndex;

/// Default number of documents returned per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Embeds queries and delegates to the shared [`VectorIndex`].
pub struct Retriever {
    index: Arc<RwLock<VectorIndex>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(index: Arc<RwLock<VectorIndex>>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Embed `query_text` and return its `k` nearest documents.
    ///
    /// An empty index yields an empty vector. An embedding failure aborts
    /// the search and propagates.
    pub async fn retrieve(&self, query_text: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let mut vectors = self.embedder.embed(&[query_text.to_string()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| SupportRagError::Embedding("provider returned no vector".into()))?;

        let index = self.index.read().await;
        index.search(&query_vector, k)
    }

    /// Batch-embed `documents` and append them to the index.
    ///
    /// Empty input is a no-op: no embedding call, no index mutation. On
    /// success the index has been persisted durably before this returns.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let mut index = self.index.write().await;
        index.add(documents, vectors)
    }
}
