//! Batch job: re-tune the forecasting model and refresh the store
//!
//! Usage:
//! ```text
//! cargo run --bin tune -- --store-dir store
//! cargo run --bin tune -- --source csv --csv data/ETH-USD.csv --config pipeline.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use eth_outlook::{build_source, init_logging, load_config, SourceKind};
use price_forecast::data::DataLoader;
use price_forecast::pipeline::run_batch;
use price_forecast::store::ParameterStore;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tune the forecasting model and persist parameters and outlook")]
struct Args {
    /// Directory holding tuned_params.json and outlook.json
    #[arg(long, env = "OUTLOOK_STORE_DIR", default_value = "store")]
    store_dir: PathBuf,

    /// Pipeline config as JSON, defaults are used for missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Price history source
    #[arg(long, value_enum, default_value_t = SourceKind::Yahoo)]
    source: SourceKind,

    /// CSV file for --source csv
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Evaluate grid points one at a time
    #[arg(long)]
    sequential: bool,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let mut config = load_config(args.config.as_deref())?;
    if args.sequential {
        config.parallel = false;
    }

    let source = build_source(args.source, args.csv.as_deref())?;
    let loader = DataLoader::from_config(source, &config);
    let store = ParameterStore::open(&args.store_dir)
        .with_context(|| format!("opening store {}", args.store_dir.display()))?;

    let outcome = run_batch(&config, &loader, &store).context("tuning run failed")?;

    println!("{}", "=".repeat(60).blue());
    println!("{}", format!("{} tuning run", config.symbol).bold().blue());
    println!("{}", "=".repeat(60).blue());
    println!("History: {} days", outcome.history_len);

    println!("\n{}", "Grid".bold());
    for (i, evaluation) in outcome.report.evaluations.iter().enumerate() {
        let line = format!(
            "  cps {:<6} sps {:<6} mae {:.4}",
            evaluation.parameters.changepoint_prior_scale,
            evaluation.parameters.seasonality_prior_scale,
            evaluation.mae
        );
        if i == outcome.report.best_index {
            println!("{}", line.green());
        } else {
            println!("{}", line);
        }
    }

    println!("\n{}", "Outlook".bold());
    print!("{}", outcome.outlook);
    println!(
        "\n{} {}",
        "Saved to".green(),
        store.dir().display()
    );

    Ok(())
}
