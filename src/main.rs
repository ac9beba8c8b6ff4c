use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Hybrid evidence retrieval for event reasoning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve evidence documents for every question, one JSON line each
    Retrieve {
        /// Documents file (docs.json)
        #[arg(long)]
        docs: PathBuf,

        /// Questions file (questions.jsonl)
        #[arg(long)]
        questions: PathBuf,

        /// Settings file
        #[arg(long, default_value = "evidence.toml")]
        config: PathBuf,

        /// Only process the first N questions
        #[arg(long)]
        limit: Option<usize>,

        /// Override retrieval.top_k from settings
        #[arg(long)]
        top_k: Option<usize>,

        /// BM25 only - no embedding or cross-encoder models needed
        #[arg(long)]
        lexical_only: bool,
    },

    /// List models known to the registry
    Models,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("evidence=info,ort=warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Retrieve {
            docs,
            questions,
            config,
            limit,
            top_k,
            lexical_only,
        } => {
            commands::retrieve::execute(commands::retrieve::RetrieveOptions {
                docs,
                questions,
                config,
                limit,
                top_k,
                lexical_only,
            })?;
        }
        Commands::Models => {
            commands::models::execute()?;
        }
    }

    Ok(())
}
