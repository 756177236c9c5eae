//! Portfolio Router REPL
//!
//! Runs one dialogue session against a local dataset.
//!
//! # Usage
//!
//! ```bash
//! portfolio_cli --assets data/assets.json --aliases data/address_aliases.json
//! > Give me the P&L for Building 180.
//! Which period should I use? You can answer with a month, a quarter or a year.
//!   1. month
//!   2. quarter
//!   3. year
//! > March 2025
//! ```
//!
//! `:context` prints the session context as JSON, `:refresh` rebuilds the
//! catalog, `:reset` drops any pending question, `:quit` exits.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use portfolio_router::dataset::{DatasetProvider, JsonAliasFile, JsonFileDataset};
use portfolio_router::dialogue::{QueryContext, Supervisor, SupervisorOutcome};
use portfolio_router::entity_linking::{CatalogHandle, CatalogSource};
use portfolio_router::routing::HandlerRegistry;
use portfolio_router::{render_clarification, RouterConfig};

#[derive(Parser)]
#[command(name = "portfolio_cli")]
#[command(version = "0.1.0")]
#[command(about = "Interactive request routing and clarification for a property portfolio")]
struct Args {
    /// Dataset JSON file (array of row objects)
    #[arg(long, env = "ASSETS_FILE")]
    assets: Option<PathBuf>,

    /// Alias JSON file mapping phrases to canonical addresses
    #[arg(long, env = "ADDRESS_ALIAS_FILE")]
    aliases: Option<PathBuf>,

    /// Skip the model-backed classification step
    #[arg(long)]
    rules_only: bool,

    /// Print routed requests as compact JSON
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let mut config = match RouterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    if let Some(assets) = args.assets.clone() {
        config.assets_file = assets;
    }
    if let Some(aliases) = args.aliases.clone() {
        config.alias_file = aliases;
    }
    if args.rules_only {
        config.enhancement.enabled = false;
    }

    match run(config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RouterConfig, args: &Args) -> anyhow::Result<()> {
    let dataset = Arc::new(JsonFileDataset::new(&config.assets_file));
    let summary = dataset.summary()?;
    let source = CatalogSource::new(dataset).with_aliases(Arc::new(JsonAliasFile::new(&config.alias_file)));

    let catalog = Arc::new(CatalogHandle::load(source)?);
    let stats = catalog.snapshot().stats();
    println!(
        "Loaded {} properties ({} rows, {} tenants) from {}",
        stats.record_count,
        summary.rows,
        stats.tenant_count,
        config.assets_file.display()
    );

    let supervisor = Supervisor::from_config(&config, catalog.clone());
    let handlers = HandlerRegistry::new().with_catalog_handlers(catalog.clone());

    let mut editor = DefaultEditor::new()?;
    let mut ctx = QueryContext::new("");

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if !input.is_empty() {
            editor.add_history_entry(input)?;
        }

        match input {
            ":quit" | ":q" => break,
            ":context" => {
                println!("{}", serde_json::to_string_pretty(&ctx)?);
                continue;
            }
            ":refresh" => {
                match catalog.refresh() {
                    Ok(fresh) => println!("Catalog refreshed ({})", fresh.fingerprint()),
                    Err(e) => println!("Refresh failed, keeping the current catalog: {e}"),
                }
                continue;
            }
            ":reset" => {
                ctx.take_pending();
                println!("Cleared pending question.");
                continue;
            }
            _ => {}
        }
        if input.is_empty() && !ctx.awaiting_user_reply() {
            continue;
        }

        match supervisor.handle(&mut ctx, input).await {
            SupervisorOutcome::Clarify(item) => {
                for note in &ctx.notes {
                    println!("note: {note}");
                }
                println!("{}", render_clarification(&item));
            }
            SupervisorOutcome::Route(routed) => {
                let json = if args.compact {
                    serde_json::to_string(&routed)?
                } else {
                    serde_json::to_string_pretty(&routed)?
                };
                println!("{json}");
                match handlers.dispatch(&routed).await {
                    Ok(response) => {
                        if let Some(message) = response.message {
                            println!("{message}");
                        }
                    }
                    Err(e) => println!("({e})"),
                }
            }
        }
    }
    Ok(())
}
