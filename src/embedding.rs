//! # Embedding provider
//!
//! The seam between the pipeline and whatever turns text into vectors.
//!
//! [`EmbeddingProvider`] is the contract: a batch call that maps each input
//! text to a fixed-dimension dense vector, preserving input order, and fails
//! the whole batch on any unrecoverable error (callers never see a partial
//! batch). [`MiniLmEmbedder`] is the bundled implementation, a
//! sentence-transformers MiniLM model run with Candle (pure Rust, no Python):
//! tokenize, BERT forward pass, attention-masked mean pooling, L2 normalize.
//!
//! The embedder is loaded **once at startup** and injected wherever needed;
//! a missing or broken model is a startup failure, not a first-request
//! surprise.

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;

use crate::config::SupportRagConfig;
use crate::error::{Result, SupportRagError};

/// Maps text to fixed-dimension dense vectors.
///
/// Implementations must return one vector per input, in input order, each of
/// exactly [`dimension`](Self::dimension) length, or fail the entire batch.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Output dimension shared by every vector this provider produces.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, order-preserving, all-or-nothing.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Sentence embedder backed by a MiniLM BERT model via Candle.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl MiniLmEmbedder {
    /// Download (or reuse the local cache of) the configured model from the
    /// Hugging Face Hub and load it onto the CPU.
    ///
    /// # Errors
    /// Any failure fetching or loading model files is returned as
    /// [`SupportRagError::Embedding`]; nothing is deferred to query time.
    pub fn load(config: &SupportRagConfig) -> Result<Self> {
        let device = Device::Cpu;
        let repo = Repo::with_revision(
            config.embedding_model.clone(),
            RepoType::Model,
            "main".to_string(),
        );
        tracing::info!("Loading embedding model {}", config.embedding_model);

        let api = Api::new().map_err(embed_err)?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json").map_err(embed_err)?;
        let tokenizer_filename = api_repo.get("tokenizer.json").map_err(embed_err)?;
        let weights_filename = api_repo.get("model.safetensors").map_err(embed_err)?;

        let bert_config = std::fs::read_to_string(config_filename)?;
        let bert_config: Config = serde_json::from_str(&bert_config)
            .map_err(|e| SupportRagError::Embedding(format!("bad model config: {e}")))?;

        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| SupportRagError::Embedding(format!("failed to load tokenizer: {e}")))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)
                .map_err(embed_err)?
        };
        let model = BertModel::load(vb, &bert_config).map_err(embed_err)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: config.embedding_dimension,
        })
    }

    /// Encode a single text into an embedding vector.
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        // Tokenizer truncates past the model's 512-token window.
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| SupportRagError::Embedding(format!("tokenization error: {e}")))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(embed_err)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(embed_err)?;

        let output = self
            .model
            .forward(&token_ids, &token_type_ids, None)
            .map_err(embed_err)?;

        let pooled = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let normalized = Self::normalize(&pooled)?;
        let vector = normalized.to_vec1::<f32>().map_err(embed_err)?;

        if vector.len() != self.dimension {
            // The configured dimension disagrees with the actual model.
            return Err(SupportRagError::Config(format!(
                "embedding model produced dimension {}, configured dimension is {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(vector)
    }

    /// Mean pooling over token embeddings, weighted by the attention mask.
    fn mean_pooling(&self, embeddings: &Tensor, attention_mask: &[u32]) -> Result<Tensor> {
        // embeddings: [1, seq_len, hidden]; mask broadcast as [1, seq_len, 1].
        let mask = Tensor::new(attention_mask, &self.device)
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.unsqueeze(0))
            .and_then(|t| t.unsqueeze(2))
            .map_err(embed_err)?;

        let masked = embeddings.broadcast_mul(&mask).map_err(embed_err)?;
        let sum = masked.sum(1).map_err(embed_err)?;
        let count = mask
            .sum(1)
            .and_then(|t| t.clamp(1f32, f32::INFINITY))
            .map_err(embed_err)?;
        sum.broadcast_div(&count)
            .and_then(|t| t.squeeze(0))
            .map_err(embed_err)
    }

    /// L2 normalize an embedding vector.
    fn normalize(tensor: &Tensor) -> Result<Tensor> {
        let norm = tensor
            .sqr()
            .and_then(|t| t.sum_all())
            .and_then(|t| t.sqrt())
            .map_err(embed_err)?;
        tensor.broadcast_div(&norm).map_err(embed_err)
    }
}

#[async_trait]
impl EmbeddingProvider for MiniLmEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.encode(text)?);
        }
        Ok(vectors)
    }
}

fn embed_err(e: impl std::fmt::Display) -> SupportRagError {
    SupportRagError::Embedding(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupportRagConfig;

    #[tokio::test]
    #[ignore = "downloads the MiniLM model from the Hugging Face Hub"]
    async fn minilm_embeds_to_configured_dimension() {
        let config = SupportRagConfig::starter();
        let embedder = MiniLmEmbedder::load(&config).unwrap();
        let vectors = embedder
            .embed(&["Rust is great!".to_string(), "I love programming.".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 384));
    }
}
