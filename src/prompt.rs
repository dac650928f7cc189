//! # Prompt composition
//!
//! Deterministically builds the bounded prompt payload for one chat turn
//! from variable-size inputs: the fixed system-instruction block, the
//! session summary, retrieved knowledge snippets, a truncated window of
//! recent history, and the current user query.
//!
//! Given the same inputs (and index contents), [`PromptComposer::compose`]
//! always produces the same string — the only nondeterminism in a turn lives
//! in the generation backend, never in prompt assembly.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{ChatTurn, ScoredDocument};
use crate::retriever::Retriever;

/// Version tag of the system-instruction block. Bump when the block changes
/// so logged prompts stay attributable.
pub const PROMPT_VERSION: &str = "2025-08-01";

/// Fixed instruction block steering the assistant.
pub const SYSTEM_PROMPT: &str = r#"You are SupportAssistant, a helpful, professional, and concise customer support agent.

CORE RULES:
1. USE RETRIEVED KNOWLEDGE: Base your answer primarily on the RETRIEVED DOCUMENTS provided below. Cite sources in brackets, e.g., [FAQ: Password Reset] or [KB-123].
2. HONESTY: If the answer is not in the retrieved documents and you don't know it generally, say "I don't have that information right now" and suggest escalation.
3. CLARITY: Keep answers under 5 short paragraphs. Use bullet points for steps.
4. TONE: Friendly, empathetic, and professional.
5. ESCALATION: If the user seems frustrated, angry, or asks for a human, suggest opening a ticket or escalate immediately.

OUTPUT FORMAT:
You must strictly output a valid JSON object with the following structure (no markdown formatting around it):
{
    "answer_text": "Your helpful response to the user...",
    "confidence": 0.0 to 1.0,
    "sources": ["source_id_1", "source_id_2"],
    "next_action": "reply",
    "action_payload": {}
}

Possible values for 'next_action': 'reply', 'escalate', 'create_ticket'.
Use 'escalate' if confidence is low (< 0.5) or user is angry."#;

/// Template combining all prompt sections. Placeholders are filled by
/// [`PromptComposer::compose`].
pub const RAG_PROMPT_TEMPLATE: &str = r#"SYSTEM INSTRUCTIONS:
{system_prompt}

SESSION CONTEXT:
Summary: {session_summary}

RETRIEVED DOCUMENTS:
{retrieved_context}

RECENT HISTORY:
{chat_history}

USER QUERY:
{user_query}

RESPONSE (JSON ONLY):
"#;

/// Rendered in place of the document list when retrieval comes back empty.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No relevant documents found.";

/// Rendered in place of the history section for a fresh conversation.
pub const EMPTY_HISTORY_PLACEHOLDER: &str = "No previous messages.";

/// Used when the session layer has not produced a summary yet.
pub const DEFAULT_SESSION_SUMMARY: &str = "No previous summary.";

/// How many trailing history turns make it into the prompt.
pub const HISTORY_WINDOW: usize = 5;

/// Render retrieved documents as a numbered, rank-ordered list.
///
/// The retriever already returns results best-first; no re-sorting happens
/// here.
pub fn render_context(retrievals: &[ScoredDocument]) -> String {
    if retrievals.is_empty() {
        return NO_CONTEXT_PLACEHOLDER.to_string();
    }
    retrievals
        .iter()
        .map(|hit| format!("{}) [{}] {}", hit.rank, hit.document.id, hit.document.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the last [`HISTORY_WINDOW`] turns, oldest first, as
/// `"Role: content"` lines with the role capitalized.
pub fn render_history(chat_history: &[ChatTurn]) -> String {
    if chat_history.is_empty() {
        return EMPTY_HISTORY_PLACEHOLDER.to_string();
    }
    let start = chat_history.len().saturating_sub(HISTORY_WINDOW);
    chat_history[start..]
        .iter()
        .map(|turn| format!("{}: {}", capitalize(&turn.role.to_string()), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Assembles the prompt payload for one turn.
pub struct PromptComposer {
    retriever: Arc<Retriever>,
}

impl PromptComposer {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }

    /// Build the prompt for `user_message`.
    ///
    /// Steps, in order: retrieve the top `k_retrieved` documents for the
    /// message, render them (or the placeholder), render the truncated
    /// recent history, fill the template. Returns the filled template plus
    /// the unsliced retrievals so the caller can record which sources were
    /// offered to the model.
    ///
    /// # Errors
    /// Propagates embedding/retrieval failures; composing itself cannot fail.
    pub async fn compose(
        &self,
        user_message: &str,
        chat_history: &[ChatTurn],
        session_summary: Option<&str>,
        k_retrieved: usize,
    ) -> Result<(String, Vec<ScoredDocument>)> {
        let retrievals = self.retriever.retrieve(user_message, k_retrieved).await?;
        tracing::debug!(
            prompt_version = PROMPT_VERSION,
            retrieved = retrievals.len(),
            "composing prompt"
        );

        let context = render_context(&retrievals);
        let history = render_history(chat_history);
        let summary = session_summary.unwrap_or(DEFAULT_SESSION_SUMMARY);

        let prompt = RAG_PROMPT_TEMPLATE
            .replace("{system_prompt}", SYSTEM_PROMPT)
            .replace("{session_summary}", summary)
            .replace("{retrieved_context}", &context)
            .replace("{chat_history}", &history)
            .replace("{user_query}", user_message);

        Ok((prompt, retrievals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::models::Document;
    use crate::vector_index::VectorIndex;
    use async_openai::types::Role;
    use async_trait::async_trait;
    use tokio::sync::RwLock;

    struct ByteSumEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ByteSumEmbedder {
        fn dimension(&self) -> usize {
            4
        }

        async fn embed(&self, texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; 4];
                    for (i, b) in text.bytes().enumerate() {
                        v[i % 4] += b as f32 / 255.0;
                    }
                    v
                })
                .collect())
        }
    }

    fn composer(dir: &std::path::Path) -> (PromptComposer, Arc<Retriever>) {
        let index = Arc::new(RwLock::new(VectorIndex::open(dir, 4).unwrap()));
        let retriever = Arc::new(Retriever::new(index, Arc::new(ByteSumEmbedder)));
        (PromptComposer::new(retriever.clone()), retriever)
    }

    fn turns(n: usize) -> Vec<ChatTurn> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                ChatTurn::new(role, format!("turn {i}"))
            })
            .collect()
    }

    #[test]
    fn empty_history_renders_placeholder() {
        assert_eq!(render_history(&[]), EMPTY_HISTORY_PLACEHOLDER);
    }

    #[test]
    fn history_truncates_to_last_five_in_order() {
        let history = turns(12);
        let rendered = render_history(&history);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), HISTORY_WINDOW);
        assert_eq!(lines[0], "Assistant: turn 7");
        assert_eq!(lines[4], "Assistant: turn 11");
        assert!(!rendered.contains("turn 6"));
    }

    #[test]
    fn short_history_is_rendered_whole() {
        let history = turns(2);
        let rendered = render_history(&history);
        assert_eq!(rendered, "User: turn 0\nAssistant: turn 1");
    }

    #[test]
    fn empty_retrievals_render_placeholder() {
        assert_eq!(render_context(&[]), NO_CONTEXT_PLACEHOLDER);
    }

    #[test]
    fn retrievals_render_as_numbered_list() {
        let hits = vec![
            ScoredDocument {
                document: Document::new("kb_1", "first snippet"),
                score: 0.1,
                rank: 1,
            },
            ScoredDocument {
                document: Document::new("kb_2", "second snippet"),
                score: 0.4,
                rank: 2,
            },
        ];
        assert_eq!(
            render_context(&hits),
            "1) [kb_1] first snippet\n2) [kb_2] second snippet"
        );
    }

    #[tokio::test]
    async fn compose_on_empty_index_uses_placeholder_and_default_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (composer, _) = composer(dir.path());
        let (prompt, retrievals) = composer
            .compose("How do I reset my password?", &[], None, 3)
            .await
            .unwrap();
        assert!(retrievals.is_empty());
        assert!(prompt.contains(NO_CONTEXT_PLACEHOLDER));
        assert!(prompt.contains(DEFAULT_SESSION_SUMMARY));
        assert!(prompt.contains("USER QUERY:\nHow do I reset my password?"));
        assert!(prompt.contains(EMPTY_HISTORY_PLACEHOLDER));
    }

    #[tokio::test]
    async fn compose_returns_unsliced_retrievals() {
        let dir = tempfile::tempdir().unwrap();
        let (composer, retriever) = composer(dir.path());
        retriever
            .ingest(vec![
                Document::new("faq_password", "reset your password"),
                Document::new("faq_billing", "update billing details"),
            ])
            .await
            .unwrap();

        let (prompt, retrievals) = composer
            .compose("reset your password", &turns(3), Some("User asked about login."), 2)
            .await
            .unwrap();
        assert_eq!(retrievals.len(), 2);
        assert_eq!(retrievals[0].document.id, "faq_password");
        assert!(prompt.contains("1) [faq_password] reset your password"));
        assert!(prompt.contains("Summary: User asked about login."));
    }

    #[test]
    fn compose_is_deterministic_via_pure_renderers() {
        let history = turns(7);
        assert_eq!(render_history(&history), render_history(&history));
    }
}
