//! CLI module for Gjenlyd.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Gjenlyd - Transcript Retrieval and Caching
///
/// A local-first tool for turning spoken-word transcripts into a queryable
/// knowledge base. The name "Gjenlyd" comes from the Norwegian word for "echo."
#[derive(Parser, Debug)]
#[command(name = "gjenlyd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Gjenlyd and write a default configuration
    Init,

    /// Chunk and index a transcript so it can be queried
    Process {
        /// Transcript file path or URL (plain text or timestamped JSON)
        input: String,
    },

    /// Ask a question against a transcript and print the best chunks
    Ask {
        /// Transcript file path or URL (plain text or timestamped JSON)
        input: String,

        /// The question to ask
        question: String,

        /// Maximum number of chunks to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Dense/lexical fusion weight in [0.0, 1.0]; 1.0 is pure vector search
        #[arg(short, long)]
        weight: Option<f32>,
    },

    /// Drop a document's cached artifacts
    Invalidate {
        /// Document ID to invalidate
        document_id: String,
    },
}
