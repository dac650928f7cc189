//! # Generation backend
//!
//! The opaque text-completion seam: prompt string in, raw text out, or
//! failure. [`OpenAiBackend`] implements it against any OpenAI-compatible
//! chat-completions endpoint. Interpretation of the returned text is
//! entirely the response parser's job — nothing here assumes a format.
//!
//! Also hosts best-effort token counting (cl100k). Counting is a side
//! computation for accounting only: it can never block or fail a turn, so
//! failures collapse to `None`.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use tiktoken_rs::{CoreBPE, cl100k_base};

use crate::config::SupportRagConfig;
use crate::error::{Result, SupportRagError};

/// Opaque text-completion call.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for `prompt`. The output is raw text; no format
    /// is guaranteed.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generation backend over an OpenAI-compatible chat-completions API.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_completion_tokens: u16,
}

impl OpenAiBackend {
    /// Build a long-lived backend handle from configuration. Constructed once
    /// at startup and injected; there is no lazy per-request client.
    pub fn new(config: &SupportRagConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.api_base.clone());
        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
            max_completion_tokens: config.max_completion_tokens,
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
            name: None,
        });

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .temperature(self.temperature)
            .max_tokens(self.max_completion_tokens)
            .messages(vec![message])
            .build()
            .map_err(|e| SupportRagError::Generation(e.to_string()))?;

        tracing::debug!(model = %self.model, "requesting completion");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SupportRagError::Generation(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SupportRagError::Generation("backend returned no completion".into()))
    }
}

static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| cl100k_base().ok());

/// Count tokens in `text`, best effort.
///
/// Returns `None` when the tokenizer is unavailable; callers treat that as
/// "unknown" and move on.
pub fn count_tokens(text: &str) -> Option<usize> {
    match CL100K.as_ref() {
        Some(bpe) => Some(bpe.encode_with_special_tokens(text).len()),
        None => {
            tracing::debug!("cl100k tokenizer unavailable, skipping token count");
            None
        }
    }
}
