//! searchstack update-index - freshen the index for app(s) or model(s)

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::app::AppContext;
use crate::engine::{self, UpdateOptions, UpdateSummary, WorkerPool};
use crate::error::{Result, StackError};

#[derive(Args, Debug, Clone)]
pub struct UpdateIndexArgs {
    /// App label or model key to update (e.g. `blog` or `blog.article`);
    /// default is every indexed model
    #[arg(value_name = "APP_OR_MODEL")]
    pub labels: Vec<String>,

    /// Number of hours back to consider records new
    #[arg(short = 'a', long)]
    pub age: Option<i64>,

    /// Start of the indexing window (RFC 3339 or YYYY-MM-DDTHH:MM:SS)
    #[arg(short = 's', long, value_name = "DATE")]
    pub start: Option<String>,

    /// End of the indexing window
    #[arg(short = 'e', long, value_name = "DATE")]
    pub end: Option<String>,

    /// Number of records to index per batch
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,

    /// Remove index records no longer present in the record store
    #[arg(short = 'r', long)]
    pub remove: bool,

    /// Only the named connection (repeatable); default is every connection
    #[arg(short = 'u', long = "using", value_name = "ALIAS")]
    pub using: Vec<String>,

    /// Worker threads to parallelize indexing
    #[arg(short = 'k', long)]
    pub workers: Option<usize>,

    /// Pass commit=false to the backend
    #[arg(long)]
    pub nocommit: bool,
}

impl UpdateIndexArgs {
    fn options(&self, ctx: &AppContext) -> Result<UpdateOptions> {
        Ok(UpdateOptions {
            age_hours: self.age,
            start_date: self.start.as_deref().map(parse_date).transpose()?,
            end_date: self.end.as_deref().map(parse_date).transpose()?,
            batch_size: self.batch_size,
            remove: self.remove,
            workers: self.workers.unwrap_or(ctx.config.workers),
            commit: !self.nocommit,
            verbosity: ctx.verbosity,
        })
    }
}

pub fn run(ctx: &AppContext, args: &UpdateIndexArgs) -> Result<()> {
    let start = Instant::now();
    let opts = args.options(ctx)?;

    let aliases = if args.using.is_empty() {
        ctx.registry.aliases()
    } else {
        args.using.clone()
    };

    // One (label, alias) pair per unit of dispatcher work; models within a
    // label are still batched by the engine.
    let mut pairs = Vec::new();
    for alias in &aliases {
        let labels = if args.labels.is_empty() {
            indexed_labels(ctx, alias)?
        } else {
            args.labels.clone()
        };
        for label in labels {
            pairs.push((label, alias.clone()));
        }
    }

    let pool = (opts.workers > 0)
        .then(|| WorkerPool::start(Arc::clone(&ctx.registry), opts.workers));

    let progress = (!ctx.robot && ctx.verbosity >= 1).then(|| {
        let bar = ProgressBar::new(pairs.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar
    });

    let mut summary = UpdateSummary::default();
    for (label, alias) in &pairs {
        if let Some(bar) = &progress {
            bar.set_message(format!("{label} ({alias})"));
        }
        match engine::update_backend(&ctx.registry, label, alias, &opts, pool.as_ref()) {
            Ok(part) => {
                summary.indexed += part.indexed;
                summary.removed += part.removed;
            }
            Err(err) => {
                // Error updating aborts the remaining work list; already
                // committed batches stay committed.
                if let Some(bar) = &progress {
                    bar.abandon();
                }
                tracing::error!(label = %label, alias = %alias, "error updating: {err}");
                return Err(err);
            }
        }
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(pool) = pool {
        pool.shutdown();
    }
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }

    let elapsed = start.elapsed();
    if ctx.robot {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "indexed": summary.indexed,
                "removed": summary.removed,
                "aliases": aliases,
                "elapsed_ms": elapsed.as_millis() as u64,
            })
        );
    } else if ctx.verbosity >= 1 {
        let removed = if args.remove {
            format!(", {} stale removed", summary.removed)
        } else {
            String::new()
        };
        println!(
            "{} Indexed {} records{} across {} connection(s) in {:.2}s",
            "✓".green().bold(),
            summary.indexed,
            removed,
            aliases.len(),
            elapsed.as_secs_f64()
        );
    }

    Ok(())
}

fn indexed_labels(ctx: &AppContext, alias: &str) -> Result<Vec<String>> {
    let unified = ctx.registry.resolve(alias)?.get_unified_index()?;
    Ok(unified
        .get_indexed_models()
        .into_iter()
        .map(|model| model.0)
        .collect())
}

/// Accepts RFC 3339, a naive datetime, or a bare date (midnight, UTC).
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(parsed.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
    }
    Err(StackError::Config(format!(
        "unparsable date '{raw}' (expected RFC 3339, YYYY-MM-DDTHH:MM:SS, or YYYY-MM-DD)"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_common_forms() {
        parse_date("2026-08-29T12:00:00Z").unwrap();
        parse_date("2026-08-29T12:00:00").unwrap();
        parse_date("2026-08-29").unwrap();
        assert!(parse_date("yesterday").is_err());
    }
}
