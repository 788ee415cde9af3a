//! Command line argument parsing for the tessera CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::content_store::ContentId;

/// Tessera - compressed content store for annotated corpora
#[derive(Parser, Debug, Clone)]
#[command(name = "tessera")]
#[command(about = "Store, retrieve and inspect documents in a tessera content store")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct TesseraArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl TesseraArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Store files as documents, creating the store if needed
    Store(StoreArgs),

    /// Print a document or a character range of it
    Get(GetArgs),

    /// Delete a document
    Delete(DeleteArgs),

    /// Show store statistics
    Info(InfoArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the store directory
    #[arg(value_name = "STORE_PATH")]
    pub store_path: PathBuf,

    /// UTF-8 text files to store, one document each
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Store configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct GetArgs {
    #[arg(value_name = "STORE_PATH")]
    pub store_path: PathBuf,

    #[arg(value_name = "ID")]
    pub id: ContentId,

    /// First character to print (inclusive)
    #[arg(long)]
    pub start: Option<usize>,

    /// Last character to print (exclusive)
    #[arg(long)]
    pub end: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(value_name = "STORE_PATH")]
    pub store_path: PathBuf,

    #[arg(value_name = "ID")]
    pub id: ContentId,
}

#[derive(Parser, Debug, Clone)]
pub struct InfoArgs {
    #[arg(value_name = "STORE_PATH")]
    pub store_path: PathBuf,

    /// List every live document with its length
    #[arg(short, long)]
    pub detailed: bool,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
