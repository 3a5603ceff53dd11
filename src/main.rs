//! orgmine CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use orgmine::catalog::PatternFilter;
use orgmine::cli::{Cli, Commands, OutputFormat};
use orgmine::config::{AppConfig, AppContext};
use orgmine::gateway;
use orgmine::ingest;
use orgmine::OrgMineError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("orgmine={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> orgmine::Result<String> {
    let config = AppConfig::from_env(cli.data_dir.clone());
    let ctx = AppContext::open(config)?;

    let output = match &cli.command {
        Commands::Ingest(args) => {
            let report = ingest::ingest_project(&ctx, &args.path, &args.brand_terms)?;
            render(cli.format, &report, |r| {
                let mut lines = vec![format!(
                    "{} new patterns, {} duplicates, {} errors",
                    r.patterns_found,
                    r.duplicates,
                    r.errors.len()
                )];
                for (kind, count) in &r.metadata_counts {
                    lines.push(format!("  {kind}: {count}"));
                }
                for error in &r.errors {
                    lines.push(format!("  error: {}: {}", error.file, error.reason));
                }
                lines.join("\n")
            })?
        }
        Commands::List(args) => {
            let filter = PatternFilter {
                category: args.category.clone(),
                pattern_type: args.pattern_type.clone(),
                source_object: args.source_object.clone(),
                min_complexity: args.min_complexity,
                max_complexity: args.max_complexity,
                favorited: args.favorited.then_some(true),
                q: args.query.clone(),
                page: args.page,
                page_size: args.page_size,
            };
            let page = ctx.store.query(&filter)?;
            render(cli.format, &page, |p| {
                let mut lines = vec![format!(
                    "{} patterns (page {}/{})",
                    p.total, p.page, p.pages
                )];
                for pattern in &p.patterns {
                    lines.push(format!(
                        "  #{} [{}] {} (complexity {}, used {}x)",
                        pattern.id,
                        pattern.category,
                        pattern.name,
                        pattern.complexity_score,
                        pattern.use_count
                    ));
                }
                lines.join("\n")
            })?
        }
        Commands::Search(args) => {
            let outcome = if args.keyword {
                gateway::keyword_fallback(&ctx, &args.query)?
            } else {
                run_async(gateway::semantic_search(&ctx, &args.query))?
            };
            render(cli.format, &outcome, |o| {
                let mut lines = vec![format!(
                    "{} results for \"{}\" (method: {})",
                    o.total,
                    o.query,
                    match o.method {
                        gateway::SearchMethod::Llm => "llm",
                        gateway::SearchMethod::Keyword => "keyword",
                    }
                )];
                for result in &o.results {
                    lines.push(format!("  #{} {}", result.id, result.name));
                }
                lines.join("\n")
            })?
        }
        Commands::Show(args) => {
            let pattern = ctx.store.get(args.id)?.ok_or(OrgMineError::InvalidFilter {
                message: format!("no pattern with id {}", args.id),
            })?;
            match cli.format {
                OutputFormat::Json => serde_json::to_string_pretty(&pattern)?,
                OutputFormat::Text => format!(
                    "#{} {} [{}]\n{}\nstructure:\n{}",
                    pattern.id,
                    pattern.name,
                    pattern.category,
                    pattern.description,
                    serde_json::to_string_pretty(&pattern.structure)?
                ),
            }
        }
        Commands::Favorite(args) => {
            let favorited =
                ctx.store
                    .toggle_favorite(args.id)?
                    .ok_or(OrgMineError::InvalidFilter {
                        message: format!("no pattern with id {}", args.id),
                    })?;
            match cli.format {
                OutputFormat::Json => {
                    serde_json::json!({ "id": args.id, "favorited": favorited }).to_string()
                }
                OutputFormat::Text => format!("pattern #{} favorited: {favorited}", args.id),
            }
        }
        Commands::Stats => {
            let stats = ctx.store.stats()?;
            render(cli.format, &stats, |s| {
                let mut lines = vec![format!(
                    "{} patterns ({} favorited)",
                    s.total_patterns, s.favorites
                )];
                for (category, count) in &s.by_category {
                    lines.push(format!("  {category}: {count}"));
                }
                lines.join("\n")
            })?
        }
        Commands::Cost => {
            let report = gateway::cost_report(&ctx)?;
            render(cli.format, &report, |r| {
                format!("daily cost: ${:.4} (limit ${:.2})", r.daily_cost, r.limit)
            })?
        }
        Commands::Projects(args) => {
            let projects = ingest::list_projects(&args.path);
            match cli.format {
                OutputFormat::Json => serde_json::to_string_pretty(&projects)?,
                OutputFormat::Text => {
                    if projects.is_empty() {
                        "no SFDX projects found".to_string()
                    } else {
                        projects
                            .iter()
                            .map(|p| format!("{} ({})", p.name, p.path))
                            .collect::<Vec<_>>()
                            .join("\n")
                    }
                }
            }
        }
    };

    ctx.close()?;
    Ok(output)
}

/// Render a serializable value as JSON or via the provided text formatter
fn render<T: serde::Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl Fn(&T) -> String,
) -> orgmine::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Text => Ok(text(value)),
    }
}

/// Run a gateway future on a fresh runtime; only the search path is async
fn run_async<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
        .block_on(future)
}
