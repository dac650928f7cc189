//! # Conversation orchestrator
//!
//! Coordinates one chat turn end-to-end: compose the prompt (which retrieves
//! knowledge), call the generation backend under a timeout, parse the raw
//! output into a decision. Every turn that reaches [`Orchestrator::handle_turn`]
//! yields exactly one decision — there is no "no answer" outcome.
//!
//! Two distinct degraded paths exist and must stay distinguishable:
//!
//! - **Backend failure** (error or timeout): the orchestrator synthesizes an
//!   apology decision with `next_action = escalate`, so the session layer
//!   gets both something to display and a triage signal.
//! - **Parse failure**: the parser's own fallback passes through unchanged —
//!   the model *did* answer, just not in JSON.
//!
//! The orchestrator does not serialize turns of the same conversation; the
//! session layer must not submit turn N+1 before turn N has been persisted.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::generation::{GenerationBackend, count_tokens};
use crate::models::{ChatTurn, ScoredDocument};
use crate::parser::{self, Decision, NextAction, ParsedResponse};
use crate::prompt::PromptComposer;
use crate::retriever::DEFAULT_TOP_K;

/// Answer text of the backend-failure fallback decision.
pub const BACKEND_FAILURE_ANSWER: &str = "I apologize, but I encountered a system error.";

/// Where a turn's decision came from, for logging and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOrigin {
    /// Parsed from valid model JSON.
    Generated,
    /// The model answered, but not in JSON; raw text passed through.
    ParseFallback,
    /// The backend errored or timed out; decision synthesized here.
    BackendFallback,
}

/// Best-effort token accounting for one turn. `None` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<usize>,
    pub completion_tokens: Option<usize>,
}

/// Everything the session layer needs to persist after one turn.
#[derive(Debug)]
pub struct TurnOutcome {
    pub decision: Decision,
    /// The documents offered to the model, best match first.
    pub retrievals: Vec<ScoredDocument>,
    pub origin: DecisionOrigin,
    pub usage: TokenUsage,
}

/// Façade over the per-turn pipeline: retrieve → compose → generate → parse.
pub struct Orchestrator {
    composer: PromptComposer,
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
    top_k: usize,
}

impl Orchestrator {
    pub fn new(
        composer: PromptComposer,
        backend: Arc<dyn GenerationBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            composer,
            backend,
            timeout,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Run one chat turn.
    ///
    /// `chat_history` excludes the current user message; `session_summary`
    /// of `None` uses the fixed default.
    ///
    /// # Errors
    /// Only pre-generation failures propagate (embedding/retrieval, which
    /// have no meaningful fallback). Backend failures and malformed output
    /// degrade to fallback decisions instead.
    pub async fn handle_turn(
        &self,
        user_message: &str,
        chat_history: &[ChatTurn],
        session_summary: Option<&str>,
    ) -> Result<TurnOutcome> {
        let (prompt, retrievals) = self
            .composer
            .compose(user_message, chat_history, session_summary, self.top_k)
            .await?;
        let prompt_tokens = count_tokens(&prompt);

        let generated = tokio::time::timeout(self.timeout, self.backend.generate(&prompt)).await;

        let (decision, origin, completion_tokens) = match generated {
            Ok(Ok(raw)) => {
                let completion_tokens = count_tokens(&raw);
                match parser::parse(&raw) {
                    ParsedResponse::Structured(decision) => {
                        (decision, DecisionOrigin::Generated, completion_tokens)
                    }
                    ParsedResponse::Fallback(decision) => {
                        tracing::warn!("model output was not valid JSON, replying with raw text");
                        (decision, DecisionOrigin::ParseFallback, completion_tokens)
                    }
                }
            }
            Ok(Err(err)) => {
                tracing::error!("generation backend failed: {err}");
                (backend_failure_decision(), DecisionOrigin::BackendFallback, None)
            }
            Err(_) => {
                tracing::error!("generation backend timed out after {:?}", self.timeout);
                (backend_failure_decision(), DecisionOrigin::BackendFallback, None)
            }
        };

        Ok(TurnOutcome {
            decision,
            retrievals,
            origin,
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
            },
        })
    }
}

fn backend_failure_decision() -> Decision {
    Decision::synthesized(BACKEND_FAILURE_ANSWER, 0.0, NextAction::Escalate)
}
