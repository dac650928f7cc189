//! Loading and handling of the application's configuration.
//!
//! Defines [`SupportRagConfig`], the knobs for the generation backend, the
//! embedding model, and the on-disk index, plus [`load_config`] to read it
//! from a YAML file. Every field that has a sensible default carries one, so
//! a minimal config only needs the API credentials.
//!
//! # Examples
//!
//! ```no_run
//! use support_rag::config::load_config;
//!
//! let config = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::error::Result;

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_completion_tokens() -> u16 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/index")
}

/// Application configuration.
///
/// Loaded from YAML with [`load_config`]. The embedding dimension must match
/// the output size of `embedding_model`; the index fails fast on any vector
/// that disagrees with it.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct SupportRagConfig {
    /// API key for the OpenAI-compatible generation backend.
    pub api_key: String,

    /// Base URL of the generation backend.
    pub api_base: String,

    /// Model identifier to request completions from.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for completions.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on completion length.
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u16,

    /// Timeout applied to each generation call; on expiry the turn degrades
    /// to the escalation fallback instead of erroring.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Hugging Face model id of the sentence-embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Output dimension of the embedding model.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Directory holding the persisted vector index artifacts.
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

impl SupportRagConfig {
    /// A starter configuration written by `srag init`.
    pub fn starter() -> Self {
        Self {
            api_key: "CHANGEME".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: default_model(),
            temperature: default_temperature(),
            max_completion_tokens: default_max_completion_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            embedding_model: default_embedding_model(),
            embedding_dimension: default_embedding_dimension(),
            index_dir: default_index_dir(),
        }
    }
}

/// Load the application's configuration from a YAML file.
///
/// # Errors
/// Fails if the file cannot be read or does not deserialize into a
/// [`SupportRagConfig`].
pub fn load_config(file: &str) -> Result<SupportRagConfig> {
    tracing::debug!("Loading config: {}", file);
    let content = fs::read_to_string(file)?;
    let config: SupportRagConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
api_key: "example_api_key"
api_base: "http://example.com/v1"
model: "example_model"
request_timeout_secs: 5
index_dir: "/tmp/srag-index"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api_key, "example_api_key");
        assert_eq!(config.api_base, "http://example.com/v1");
        assert_eq!(config.model, "example_model");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.index_dir, PathBuf::from("/tmp/srag-index"));
        // Defaults fill in everything left unspecified.
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_completion_tokens, 1024);
        assert_eq!(config.embedding_dimension, 384);
    }

    #[test]
    fn test_load_config_missing_file() {
        let config = load_config("non/existent/path");
        assert!(config.is_err());
    }

    #[test]
    fn test_load_config_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"invalid: config: format"#).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap());
        assert!(config.is_err());
    }
}
