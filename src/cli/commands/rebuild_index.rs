//! searchstack rebuild-index - clear everything, then update

use clap::Args;

use crate::app::AppContext;
use crate::error::Result;

use super::{clear_index, update_index};

/// Only the subset of clear-index/update-index options that make sense for
/// a full rebuild.
#[derive(Args, Debug, Clone)]
pub struct RebuildIndexArgs {
    /// Skip the confirmation prompt and wipe the data
    #[arg(long)]
    pub noinput: bool,

    /// Only the named connection (repeatable); default is every connection
    #[arg(short = 'u', long = "using", value_name = "ALIAS")]
    pub using: Vec<String>,

    /// Number of records to index per batch
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,

    /// Worker threads to parallelize indexing
    #[arg(short = 'k', long)]
    pub workers: Option<usize>,

    /// Pass commit=false to the backend
    #[arg(long)]
    pub nocommit: bool,
}

pub fn run(ctx: &AppContext, args: &RebuildIndexArgs) -> Result<()> {
    clear_index::run(
        ctx,
        &clear_index::ClearIndexArgs {
            noinput: args.noinput,
            using: args.using.clone(),
            nocommit: args.nocommit,
        },
    )?;

    update_index::run(
        ctx,
        &update_index::UpdateIndexArgs {
            labels: Vec::new(),
            age: None,
            start: None,
            end: None,
            batch_size: args.batch_size,
            remove: false,
            using: args.using.clone(),
            workers: args.workers,
            nocommit: args.nocommit,
        },
    )
}
