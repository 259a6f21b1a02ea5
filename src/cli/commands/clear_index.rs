//! searchstack clear-index - wipe one or more connections

use std::io::Write;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::engine;
use crate::error::Result;

#[derive(Args, Debug, Clone)]
pub struct ClearIndexArgs {
    /// Skip the confirmation prompt and wipe the data
    #[arg(long)]
    pub noinput: bool,

    /// Only the named connection (repeatable); default is every connection
    #[arg(short = 'u', long = "using", value_name = "ALIAS")]
    pub using: Vec<String>,

    /// Pass commit=false to the backend
    #[arg(long)]
    pub nocommit: bool,
}

pub fn run(ctx: &AppContext, args: &ClearIndexArgs) -> Result<()> {
    let aliases = if args.using.is_empty() {
        ctx.registry.aliases()
    } else {
        args.using.clone()
    };

    if !args.noinput && !confirm(&aliases)? {
        if !ctx.robot {
            println!("No action taken.");
        }
        return Ok(());
    }

    engine::clear_index(&ctx.registry, &aliases, !args.nocommit)?;

    if ctx.robot {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "cleared": aliases,
                "commit": !args.nocommit,
            })
        );
    } else if ctx.verbosity >= 1 {
        println!(
            "{} Removed all documents from {}",
            "✓".green().bold(),
            format!("'{}'", aliases.join("', '")).bold()
        );
    }

    Ok(())
}

fn confirm(aliases: &[String]) -> Result<bool> {
    println!();
    println!(
        "{} This will irreparably remove EVERYTHING from your search index in connection '{}'.",
        "WARNING:".yellow().bold(),
        aliases.join("', '")
    );
    println!("Your choices after this are to restore from backups or rebuild via `rebuild-index`.");
    print!("Are you sure you wish to continue? [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    println!();

    Ok(answer.trim().to_lowercase().starts_with('y'))
}
