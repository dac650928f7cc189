//! # Response parser
//!
//! Recovers a structured [`Decision`] from the generation backend's raw text,
//! which is *expected* to be a JSON object but is not guaranteed to be one.
//!
//! [`parse`] is a pure function: trim, strip a single leading ```` ```json ````
//! fence and a single trailing ```` ``` ```` fence, then strict-parse. Success
//! returns exactly what was parsed — absent keys stay absent, the parser never
//! injects defaults. Failure produces the fallback decision, which carries the
//! model's entire raw output verbatim as the answer: losing formatting beats
//! losing the model's words.
//!
//! The outcome is tagged ([`ParsedResponse`]) so callers can log the repair
//! path without branching on an error type.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Default answer used when a successfully parsed object omits `answer_text`.
pub const MISSING_ANSWER_TEXT: &str = "I'm having trouble connecting right now.";

/// Confidence assigned to unparseable model output.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

static EMPTY_PAYLOAD: once_cell::sync::Lazy<Map<String, Value>> =
    once_cell::sync::Lazy::new(Map::new);

/// What the conversation should do next.
///
/// The value originates from an untrusted generator, so the wire decoding
/// never fails: anything outside the known set normalizes to [`Reply`](Self::Reply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Reply,
    Escalate,
    CreateTicket,
}

impl NextAction {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "reply" => Self::Reply,
            "escalate" => Self::Escalate,
            "create_ticket" => Self::CreateTicket,
            other => {
                tracing::debug!("unrecognized next_action {other:?}, defaulting to reply");
                Self::Reply
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Escalate => "escalate",
            Self::CreateTicket => "create_ticket",
        }
    }
}

impl std::fmt::Display for NextAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn next_action_from_wire<'de, D>(deserializer: D) -> Result<Option<NextAction>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| NextAction::from_wire(&s)))
}

/// The structured outcome of one chat turn.
///
/// This is the wire shape: every key the model omitted stays `None`. Consumers
/// apply defaults through the accessor methods ([`answer()`](Self::answer),
/// [`confidence()`](Self::confidence()), [`cited_sources()`](Self::cited_sources),
/// [`action()`](Self::action), [`payload()`](Self::payload)) rather than the
/// parser rewriting the object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
    /// Model-reported confidence. Intended range is [0, 1] but the parser
    /// passes the value through unclamped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "next_action_from_wire"
    )]
    pub next_action: Option<NextAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_payload: Option<Map<String, Value>>,
}

impl Decision {
    /// Build a fully-specified decision, used for the synthesized fallback
    /// paths where no key should be left to caller defaults.
    pub fn synthesized(
        answer_text: impl Into<String>,
        confidence: f64,
        next_action: NextAction,
    ) -> Self {
        Self {
            answer_text: Some(answer_text.into()),
            confidence: Some(confidence),
            sources: Some(Vec::new()),
            next_action: Some(next_action),
            action_payload: Some(Map::new()),
        }
    }

    /// The user-visible answer.
    pub fn answer(&self) -> &str {
        self.answer_text.as_deref().unwrap_or(MISSING_ANSWER_TEXT)
    }

    /// Confidence, defaulting to 0.0 when absent. Not clamped.
    pub fn confidence(&self) -> f64 {
        self.confidence.unwrap_or(0.0)
    }

    /// Cited source identifiers, defaulting to none.
    pub fn cited_sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or(&[])
    }

    /// Next action, defaulting to [`NextAction::Reply`].
    pub fn action(&self) -> NextAction {
        self.next_action.unwrap_or(NextAction::Reply)
    }

    /// Action payload, defaulting to an empty mapping.
    pub fn payload(&self) -> &Map<String, Value> {
        self.action_payload.as_ref().unwrap_or(&EMPTY_PAYLOAD)
    }
}

/// Tagged parse outcome: a decision either parsed from the model's JSON or
/// synthesized from its unparseable output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// The model produced valid JSON; the decision is exactly what it said.
    Structured(Decision),
    /// The model's output was not valid JSON; the decision wraps it verbatim.
    Fallback(Decision),
}

impl ParsedResponse {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn into_decision(self) -> Decision {
        match self {
            Self::Structured(d) | Self::Fallback(d) => d,
        }
    }
}

/// Parse raw model output into a [`Decision`].
///
/// Pure function of `raw_text`; never retries, never errors.
pub fn parse(raw_text: &str) -> ParsedResponse {
    let mut cleaned = raw_text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    match serde_json::from_str::<Decision>(cleaned) {
        Ok(decision) => ParsedResponse::Structured(decision),
        Err(err) => {
            tracing::debug!("model output failed strict JSON parse: {err}");
            ParsedResponse::Fallback(Decision {
                answer_text: Some(raw_text.to_string()),
                confidence: Some(FALLBACK_CONFIDENCE),
                sources: Some(Vec::new()),
                next_action: Some(NextAction::Reply),
                action_payload: Some(Map::new()),
            })
        }
    }
}
