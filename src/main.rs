//! # Reindex CLI (`reindex`)
//!
//! ## Usage
//!
//! ```bash
//! reindex --config ./config/reindex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `reindex blob <name>` | Fetch, chunk, and upsert one object |
//! | `reindex prefix <prefix>` | Re-index every object under a prefix |
//! | `reindex chunk <file>` | Chunk a local file and print a summary |
//! | `reindex serve` | Start the HTTP server |
//!
//! Results are printed to stdout as JSON; logs go to stderr (`RUST_LOG`
//! controls verbosity, default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use blob_reindex::chunk::chunk_text;
use blob_reindex::config::{load_config, Config};
use blob_reindex::decode::decode;
use blob_reindex::ingest::Reindexer;
use blob_reindex::models::ReindexOutcome;
use blob_reindex::server::run_server;

/// Re-index blob-store documents into a search index as bounded,
/// stably-addressed chunks.
#[derive(Parser)]
#[command(name = "reindex", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the file does not exist, built-in defaults are used: a
    /// filesystem store rooted at `.` and an in-memory index.
    #[arg(long, global = true, default_value = "./config/reindex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-index a single object by name.
    Blob {
        /// Object name (path-like key) in the configured store.
        name: String,

        /// Fetch and chunk, but do not upsert. Prints the documents that
        /// would be written.
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-index every object under a prefix.
    Prefix {
        /// Name prefix; empty means the whole store.
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Chunk a local file and print one line per chunk.
    Chunk {
        file: PathBuf,

        /// Character budget per chunk. Defaults to `[chunking].max_chars`.
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Blob { name, dry_run } => {
            let reindexer = Reindexer::from_config(&config)?;
            if dry_run {
                run_dry(&reindexer, &name).await?;
            } else {
                let outcome = reindexer.reindex(&name).await;
                println!("{}", serde_json::to_string_pretty(&outcome.to_envelope())?);
                if let ReindexOutcome::Failed(_) = outcome {
                    std::process::exit(1);
                }
            }
        }
        Commands::Prefix { prefix } => {
            let reindexer = Reindexer::from_config(&config)?;
            let report = reindexer.reindex_prefix(&prefix).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.failures > 0 {
                std::process::exit(1);
            }
        }
        Commands::Chunk { file, max_chars } => {
            let max_chars = max_chars.unwrap_or(config.chunking.max_chars);
            if max_chars == 0 {
                anyhow::bail!("--max-chars must be > 0");
            }
            let raw = std::fs::read(&file)?;
            let decoded = decode(&raw);
            if decoded.lossy {
                warn!(file = %file.display(), "not valid UTF-8; decoded with single-byte fallback");
            }
            let chunks = chunk_text(&decoded.text, max_chars);
            for c in &chunks {
                let preview: String = c
                    .text
                    .chars()
                    .take(60)
                    .map(|ch| if ch.is_control() { ' ' } else { ch })
                    .collect();
                println!("[{:04}] {:>6} chars | {}", c.index, c.text.chars().count(), preview);
            }
            println!("chunks: {}", chunks.len());
        }
        Commands::Serve => {
            run_server(&config).await?;
        }
    }

    Ok(())
}

async fn run_dry(reindexer: &Reindexer, name: &str) -> Result<()> {
    match reindexer.preview(name).await {
        Ok(prepared) => {
            let documents: Vec<_> = prepared
                .documents
                .iter()
                .map(|d| {
                    json!({
                        "id": d.id,
                        "title": d.title,
                        "chars": d.content.chars().count(),
                        "url": d.url,
                    })
                })
                .collect();
            let out = json!({
                "ok": true,
                "dry_run": true,
                "name": name,
                "lossy": prepared.lossy,
                "chunks": documents.len(),
                "documents": documents,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Err(err) => {
            let out = ReindexOutcome::Failed(err).to_envelope();
            println!("{}", serde_json::to_string_pretty(&out)?);
            std::process::exit(1);
        }
    }
}

fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        warn!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::default())
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
