//! Command-line interface definition, parsed with `clap`.
//!
//! Provides a [`Cli`] struct for the parsed arguments and a [`Commands`]
//! enum with the available subcommands and their options.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Ask the assistant one question and print its decision.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The user's question.
        question: String,

        /// Session summary to include in the prompt context.
        #[arg(name = "summary", short = 's', long)]
        summary: Option<String>,
    },

    /// Load a FAQ JSON file into the vector index.
    #[clap(name = "ingest")]
    Ingest {
        /// Path to a JSON array of FAQ records.
        file: PathBuf,
    },

    /// Query the vector index directly, bypassing the model. Useful for
    /// checking what the assistant would be grounded on.
    #[clap(name = "search")]
    Search {
        /// Free-text query.
        query: String,

        /// How many documents to return.
        #[arg(short = 'k', default_value_t = 3)]
        k: usize,
    },

    /// Write a starter configuration file.
    Init,
}
