//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod clear_index;
pub mod info;
pub mod rebuild_index;
pub mod update_index;

use crate::app::AppContext;
use crate::error::Result;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::ClearIndex(args) => clear_index::run(ctx, args),
        Commands::UpdateIndex(args) => update_index::run(ctx, args),
        Commands::RebuildIndex(args) => rebuild_index::run(ctx, args),
        Commands::Info(args) => info::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clear out the search index completely
    ClearIndex(clear_index::ClearIndexArgs),

    /// Freshen the index for the given app(s) or model(s)
    UpdateIndex(update_index::UpdateIndexArgs),

    /// Rebuild the index: clear, then update
    RebuildIndex(rebuild_index::RebuildIndexArgs),

    /// Show connections, indexed models, and document counts
    Info(info::InfoArgs),
}
