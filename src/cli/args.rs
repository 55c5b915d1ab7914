//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::documents::IngestMode;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "\
Quick Start:
  $ doclens init                          # Create .doclens/settings.toml
  $ doclens ingest manual.pdf             # Build the index from a document
  $ doclens ingest notes.md --mode append # Add another document
  $ doclens query \"How do I reset it?\"    # Ask a question
  $ doclens serve                         # Start the HTTP API";

/// Ask questions about your documents
#[derive(Parser)]
#[command(
    name = "doclens",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ask questions about your documents",
    long_about = "Ingest PDF and text documents into a local vector index and answer \
                  questions with a retrieval-augmented language model.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show informational logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Set up .doclens directory with default configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load, chunk and embed a document into the index
    Ingest {
        /// PDF, text or Markdown document
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Replace the index or append to it (overrides config)
        #[arg(short, long)]
        mode: Option<IngestMode>,

        /// Maximum chunk size in characters (overrides config)
        #[arg(long)]
        max_chunk_chars: Option<usize>,

        /// Overlap between chunks in characters (overrides config)
        #[arg(long)]
        overlap_chars: Option<usize>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,

        /// Output the ingest report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the ingested documents
    Query {
        /// The question to answer
        question: String,

        /// Number of chunks given to the model (overrides config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the retrieved chunks after the answer
        #[arg(short, long)]
        sources: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the chunks most similar to a query without calling the model
    Search {
        /// Search text
        query: String,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = 4)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the state of the persisted index
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API
    #[cfg(feature = "http-server")]
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },
}
