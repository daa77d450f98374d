pub mod commands;
mod execute;

use clap::Parser;
use std::path::PathBuf;

pub use commands::Commands;

#[derive(Parser, Debug)]
#[command(name = "resindex")]
#[command(about = "Inspect and maintain the resilient indexer's retry queue", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (JSON); defaults to $RESINDEX_CONFIG when set
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Retry queue file, overriding the configured path
    #[arg(long, global = true)]
    pub queue_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
