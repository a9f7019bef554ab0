use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use sales_analytics::config::Config;
use sales_analytics::ingest;
use sales_analytics::pipeline::Pipeline;
use sales_analytics::reports::{self, Format, ReportParams};
use sales_analytics::store::{LoadOutcome, SalesStore};
use sales_analytics::{logging, metrics};

#[derive(Parser)]
#[command(name = "sales_analytics")]
#[command(about = "Clean a sales dataset and run the reporting catalog")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write a Prometheus text snapshot of run metrics to this file on exit
    #[arg(long, global = true)]
    metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw CSV and write the cleaned records as CSV
    Clean {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Clean a raw CSV and load it into the store
    Load {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Store file (overrides store.path)
        #[arg(long)]
        db: Option<String>,
    },
    /// Run catalog reports against a loaded store
    Report {
        #[arg(long)]
        db: Option<String>,
        /// Report names to run (repeatable); all when omitted
        #[arg(long = "query")]
        queries: Vec<String>,
        #[arg(long, value_enum)]
        format: Option<Format>,
        #[arg(long)]
        previous_year: Option<i32>,
        #[arg(long)]
        current_year: Option<i32>,
        #[arg(long)]
        top_k: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// List the report catalog and column contracts
    Queries,
    /// Look up the preferred payment method of one branch
    PreferredPayment {
        #[arg(long)]
        branch: String,
        #[arg(long)]
        db: Option<String>,
    },
    /// Clean, load into memory, run every report and save a JSON summary
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<Format>,
        /// Skip writing the JSON summary to the output directory
        #[arg(long)]
        no_persist: bool,
    },
}

fn resolve_input(cli_input: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    cli_input
        .or_else(|| config.input.path.as_ref().map(PathBuf::from))
        .ok_or_else(|| anyhow!("no input file: pass --input or set input.path in the config"))
}

fn open_store(db: Option<String>, config: &Config) -> Result<SalesStore> {
    let path = db.unwrap_or_else(|| config.store.path.clone());
    SalesStore::open(&path).with_context(|| format!("opening store {path}"))
}

fn open_existing_store(db: Option<String>, config: &Config) -> Result<SalesStore> {
    let path = db.unwrap_or_else(|| config.store.path.clone());
    SalesStore::open_existing(&path).with_context(|| format!("opening store {path}"))
}

fn write_metrics_snapshot(path: &Path) -> Result<()> {
    match metrics::render() {
        Some(text) => {
            std::fs::write(path, text)
                .with_context(|| format!("writing metrics to {}", path.display()))?;
            info!("Wrote metrics snapshot to {}", path.display());
        }
        None => error!("Metrics recorder not installed; no snapshot written"),
    }
    Ok(())
}

fn run_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Clean { input, output } => {
            let input = resolve_input(input, config)?;
            let cleaned = Pipeline::clean_file(config, &input)?;
            ingest::write_clean_file(&output, &cleaned.records)?;
            let s = &cleaned.stats;
            println!("🧹 Cleaned {} of {} rows -> {}", s.clean_rows, s.input_rows, output.display());
            println!(
                "   duplicates: {}, missing: {}, malformed: {}, conflicting ids: {}, unreadable: {}",
                s.duplicate_rows, s.missing_field_rows, s.malformed_rows, s.conflicting_id_rows, s.unreadable_rows
            );
        }
        Commands::Load { input, db } => {
            let input = resolve_input(input, config)?;
            let mut store = open_store(db, config)?;
            let (cleaned, sha256, outcome) = Pipeline::load_file(config, &input, &mut store)?;
            match outcome {
                LoadOutcome::Loaded { run_id, rows } => {
                    println!("💾 Loaded {} records (run {}, sha256 {})", rows, run_id, sha256);
                    println!("   {} rows dropped during cleaning", cleaned.stats.dropped_rows());
                }
                LoadOutcome::AlreadyLoaded { run_id } => {
                    println!("ℹ️  {} was already loaded by run {}", input.display(), run_id);
                }
            }
        }
        Commands::Report {
            db,
            queries,
            format,
            previous_year,
            current_year,
            top_k,
            limit,
        } => {
            let store = open_existing_store(db, config)?;
            let defaults = config.reports.params();
            let params = ReportParams {
                previous_year: previous_year.unwrap_or(defaults.previous_year),
                current_year: current_year.unwrap_or(defaults.current_year),
                top_k: top_k.unwrap_or(defaults.top_k),
                limit: limit.unwrap_or(defaults.limit),
            };
            let results = if queries.is_empty() {
                reports::run_all(&store, &params)?
            } else {
                queries
                    .iter()
                    .map(|name| reports::run_named(&store, name, &params))
                    .collect::<sales_analytics::Result<Vec<_>>>()?
            };
            let format = format.unwrap_or(config.reports.format);
            print!("{}", reports::render_all(&results, format)?);
        }
        Commands::Queries => {
            for (i, q) in reports::catalog().iter().enumerate() {
                println!("{:>2}. {:<36} {}", i + 1, q.name, q.description);
                println!("    columns: {}", q.columns.join(", "));
            }
        }
        Commands::PreferredPayment { branch, db } => {
            let store = open_existing_store(db, config)?;
            match store.preferred_payment_for(&branch)? {
                Some(p) => println!(
                    "{}: {} ({} transactions)",
                    p.branch, p.preferred_payment_method, p.no_transactions
                ),
                None => println!("No transactions recorded for branch '{}'", branch),
            }
        }
        Commands::Run {
            input,
            format,
            no_persist,
        } => {
            let input = resolve_input(input, config)?;
            let result = Pipeline::run(config, &input)?;
            let format = format.unwrap_or(config.reports.format);
            print!("{}", reports::render_all(&result.reports, format)?);
            println!("\n📊 Pipeline results for {}:", result.source);
            println!("   Input rows: {}", result.stats.input_rows);
            println!("   Loaded: {}", result.records_loaded);
            println!("   Dropped: {}", result.stats.dropped_rows());
            if !no_persist {
                let path = Pipeline::persist_to_json(&result, &config.output.dir)?;
                println!("   Summary: {}", path);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let _guard = logging::init_logging(&config.logging);
    for key in &config.env_overrides {
        info!("Configuration overridden by {}", key);
    }
    metrics::init_metrics();

    let outcome = run_command(cli.command, &config);
    if let Err(e) = &outcome {
        error!("Command failed: {:#}", e);
    }

    if let Some(path) = &cli.metrics_out {
        write_metrics_snapshot(path)?;
    }
    outcome
}
