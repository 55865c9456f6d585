//! CLI module for Pensum.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Pensum - Course Material Q&A
///
/// A CLI tool for asking questions about indexed course transcripts.
/// The name "Pensum" comes from the Norwegian word for "curriculum."
#[derive(Parser, Debug)]
#[command(name = "pensum")]
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
    /// Ask a question about the indexed course materials
    Ask {
        /// The question to ask
        question: String,

        /// Continue an existing conversation session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Start an interactive chat session
    Chat,

    /// Index pre-chunked course documents from JSON files
    Ingest {
        /// A course document file, or a directory of them
        path: String,

        /// Re-index courses that are already in the catalog
        #[arg(short, long)]
        force: bool,
    },

    /// Show catalog statistics
    Stats,
}
