//! searchstack info - show connections, indexed models, and counts

use std::sync::Arc;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::error::Result;
use crate::query::SearchQuerySet;

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Only the named connection (repeatable)
    #[arg(short = 'u', long = "using", value_name = "ALIAS")]
    pub using: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &InfoArgs) -> Result<()> {
    let aliases = if args.using.is_empty() {
        ctx.registry.aliases()
    } else {
        args.using.clone()
    };

    let mut report = Vec::new();
    for alias in &aliases {
        let connection = ctx.registry.resolve(alias)?;
        let unified = connection.get_unified_index()?;
        let backend = connection.get_backend()?;

        let mut models = Vec::new();
        for model in unified.get_indexed_models() {
            let index = unified.get_index(&model)?;
            let (content_field, schema) = backend.build_schema(index.fields());
            let count = SearchQuerySet::new(Arc::clone(&ctx.registry), Some(alias))
                .models([model.clone()])
                .count()?;
            models.push((model, count, content_field, schema));
        }
        report.push((alias.clone(), connection.config().engine.clone(), models));
    }

    // Write routing is global, not per connection: resolve once per model
    // across every unified index.
    let mut routes = std::collections::BTreeMap::new();
    for (_, _, models) in &report {
        for (model, _, _, _) in models {
            routes
                .entry(model.clone())
                .or_insert_with(|| ctx.routers.resolve_write(model, None));
        }
    }

    if ctx.robot {
        let connections: Vec<serde_json::Value> = report
            .iter()
            .map(|(alias, engine, models)| {
                serde_json::json!({
                    "alias": alias,
                    "engine": engine,
                    "models": models
                        .iter()
                        .map(|(model, count, content_field, schema)| {
                            serde_json::json!({
                                "model": model,
                                "documents": count,
                                "content_field": content_field,
                                "fields": schema
                                    .iter()
                                    .map(|field| {
                                        serde_json::json!({
                                            "name": field.name,
                                            "indexed": field.indexed,
                                            "stored": field.stored,
                                        })
                                    })
                                    .collect::<Vec<_>>(),
                            })
                        })
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        let routing: Vec<serde_json::Value> = routes
            .iter()
            .map(|(model, alias)| serde_json::json!({"model": model, "write_alias": alias}))
            .collect();
        println!(
            "{}",
            serde_json::json!({ "connections": connections, "routing": routing })
        );
        return Ok(());
    }

    println!("{}", "Loaded search connections:".bold());
    for (alias, engine, models) in &report {
        println!();
        println!("  {} ({})", alias.cyan().bold(), engine);
        if models.is_empty() {
            println!("    {}", "no indexed models".dimmed());
        }
        for (model, count, content_field, schema) in models {
            println!(
                "    {model}: {count} documents ({} fields, content '{content_field}')",
                schema.len()
            );
        }
    }

    if !routes.is_empty() {
        println!();
        println!("{}", "Write routing:".bold());
        for (model, alias) in &routes {
            println!("  {model} -> {}", alias.cyan());
        }
    }

    Ok(())
}
