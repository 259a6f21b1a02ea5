//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

pub mod commands;

pub use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "searchstack",
    version,
    about = "Keep search backends in sync with an authoritative record store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub robot: bool,
}
