use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Base directory for config and data files.
    /// Defaults to ~/.pantryd
    #[clap(short, long)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Daemon {},

    /// Ingest raw recipe JSON files and rebuild the index artifacts
    Ingest {
        /// Directory containing raw recipe .json files
        #[clap(short, long)]
        data_dir: PathBuf,
    },

    /// Match recipes against the current pantry and print them as JSON
    Match {
        /// Number of suggestions
        #[clap(short)]
        k: Option<usize>,
    },

    /// Search recipes by exact ingredient tokens
    Search {
        /// Comma-separated ingredient tokens (e.g. "flour,apple")
        #[clap(short, long)]
        ingredients: String,
    },
}
