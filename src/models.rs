//! # Core data types
//!
//! Plain data structures shared across the retrieval pipeline:
//!
//! - [`Document`]: an immutable knowledge unit held by the vector index.
//! - [`ScoredDocument`]: a per-query search hit with its distance and rank.
//! - [`ChatTurn`]: one prior message of the conversation, owned by the
//!   caller and consumed read-only by the prompt composer.
//!
//! None of these types touch storage or the network; they exist so the
//! index, retriever, composer, and orchestrator agree on shapes.

use async_openai::types::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An immutable knowledge unit.
///
/// Created during ingestion, never mutated afterwards; the index is
/// append-only, so documents are never individually deleted either.
///
/// # Examples
/// ```rust
/// use support_rag::models::Document;
///
/// let doc = Document::new("faq_password_reset", "Question: How do I reset my password?");
/// assert_eq!(doc.id, "faq_password_reset");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, cited back to the model as `[id]`.
    pub id: String,
    /// The content that was embedded.
    pub text: String,
    /// Opaque key-value mapping (e.g. category, source question).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A [`Document`] paired with its distance to a query vector.
///
/// Produced per query and never persisted. `score` is squared Euclidean
/// distance, so lower means more similar; `rank` is 1-based among the
/// returned results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
    pub rank: usize,
}

/// One prior turn of the conversation, as supplied by the session layer.
///
/// The pipeline treats a slice of these as read-only input; the session
/// layer must not mutate a turn after handing it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Sender role (`user`, `assistant`, or `system`).
    pub role: Role,
    pub content: String,
    /// Model-reported confidence for assistant turns, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Source identifiers cited by assistant turns, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Build a bare turn with the current timestamp.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            confidence: None,
            sources: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_metadata_defaults_to_empty() {
        let doc: Document = serde_json::from_str(r#"{"id":"d1","text":"hello"}"#).unwrap();
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn chat_turn_round_trips() {
        let turn = ChatTurn::new(Role::User, "hi there");
        let json = serde_json::to_string(&turn).unwrap();
        let back: ChatTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::User);
        assert_eq!(back.content, "hi there");
        assert!(back.confidence.is_none());
    }
}
