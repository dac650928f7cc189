//! Main module for the support_rag CLI (srag).
//!
//! Parses the command line, loads configuration, constructs the long-lived
//! pipeline handles (embedding model, vector index, generation backend) once,
//! and dispatches to the requested subcommand.
//!
//! # Examples
//!
//! ```sh
//! srag init
//! srag ingest data/sample_faqs.json
//! srag search "reset my password"
//! srag ask "How do I reset my password?"
//! ```

use clap::Parser;
use once_cell::sync::OnceCell;
use std::{env, error::Error, fs, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{debug, info};

use support_rag::{
    commands::{Cli, Commands},
    config::{self, SupportRagConfig},
    embedding::MiniLmEmbedder,
    generation::OpenAiBackend,
    knowledge,
    orchestrator::Orchestrator,
    prompt::PromptComposer,
    retriever::Retriever,
    vector_index::VectorIndex,
};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        return init();
    }

    // SUPPORT_RAG_CONFIG overrides the default location, mainly for
    // development checkouts.
    let config_path = match env::var("SUPPORT_RAG_CONFIG") {
        Ok(path) => path.into(),
        Err(_) => support_rag::config_dir()?.join("config.yaml"),
    };
    debug!("Loading config from: {}", config_path.display());
    let config = config::load_config(config_path.to_str().ok_or("non-UTF8 config path")?)?;

    // Startup initialization: load the embedding model and open the index
    // once, then inject the handles everywhere they are needed.
    let embedder = Arc::new(MiniLmEmbedder::load(&config)?);
    let index = VectorIndex::open(&config.index_dir, config.embedding_dimension)?;
    info!("Index ready with {} documents", index.count());
    let retriever = Arc::new(Retriever::new(Arc::new(RwLock::new(index)), embedder));

    match cli.command {
        Commands::Ask { question, summary } => {
            let backend = Arc::new(OpenAiBackend::new(&config));
            let orchestrator = Orchestrator::new(
                PromptComposer::new(retriever.clone()),
                backend,
                Duration::from_secs(config.request_timeout_secs),
            );

            let outcome = orchestrator
                .handle_turn(&question, &[], summary.as_deref())
                .await?;
            debug!("Decision origin: {:?}", outcome.origin);

            println!("{}", outcome.decision.answer());
            println!();
            println!("confidence:  {:.2}", outcome.decision.confidence());
            println!("next_action: {}", outcome.decision.action());
            if !outcome.decision.cited_sources().is_empty() {
                println!("sources:     {}", outcome.decision.cited_sources().join(", "));
            }
        }
        Commands::Ingest { file } => {
            let count = knowledge::ingest_faq_file(&retriever, &file).await?;
            println!("Indexed {count} documents from {}", file.display());
        }
        Commands::Search { query, k } => {
            let hits = retriever.retrieve(&query, k).await?;
            if hits.is_empty() {
                println!("No matches (index may be empty — run `srag ingest` first).");
            }
            for hit in hits {
                println!("{}) [{}] score={:.4}", hit.rank, hit.document.id, hit.score);
                println!("   {}", hit.document.text.replace('\n', "\n   "));
            }
        }
        Commands::Init => unreachable!("handled above"),
    }

    Ok(())
}

/// Write a starter configuration file under the platform config directory.
fn init() -> Result<(), Box<dyn Error>> {
    let config_dir = support_rag::config_dir()?;
    fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.yaml");
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    let config_yaml = serde_yaml::to_string(&SupportRagConfig::starter())?;
    fs::write(&config_path, config_yaml)?;
    println!("Wrote starter config to {}", config_path.display());
    println!("Set your api_key and api_base, then run `srag ingest data/sample_faqs.json`.");

    Ok(())
}
