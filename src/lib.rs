//! # support_rag (library root)
//!
//! Core of a retrieval-augmented customer-support chat backend:
//!
//! - Embedding seam and bundled MiniLM sentence embedder (`embedding`).
//! - Persistent exact nearest-neighbor index over knowledge documents
//!   (`vector_index`) and its query-time wrapper (`retriever`).
//! - Deterministic bounded prompt assembly (`prompt`).
//! - Defensive parsing of model output into action decisions (`parser`).
//! - Per-turn coordination with backend-failure fallbacks (`orchestrator`).
//! - FAQ batch ingestion (`knowledge`) and the `srag` CLI (`commands`).
//!
//! Session persistence, HTTP routing, and ticket bookkeeping are external
//! collaborators: callers supply conversation history and a session summary
//! per turn and persist the returned decision themselves.
//!
//! Everything long-lived (embedding model, index, backend client) is
//! constructed once at startup and passed in explicitly — there are no
//! module-level singletons, and tests substitute fakes at the
//! `EmbeddingProvider` / `GenerationBackend` seams without patching shared
//! state.

use directories::ProjectDirs;
use std::path::PathBuf;

pub mod commands;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod knowledge;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod retriever;
pub mod vector_index;

pub use error::{Result, SupportRagError};

/// Return the per-platform configuration directory.
///
/// Uses [`directories::ProjectDirs`] with the application triple
/// `("com", "support-rag", "srag")`, e.g. `~/.config/srag` on Linux (XDG).
/// The directory is **not** created by this function; callers that need it
/// should create it with `fs::create_dir_all`.
///
/// # Errors
/// Fails if the platform configuration directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "support-rag", "srag")
        .ok_or_else(|| SupportRagError::Config("unable to determine config directory".into()))?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
