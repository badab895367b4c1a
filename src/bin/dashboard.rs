//! Render a forecast for the chosen horizon and interval
//!
//! Usage:
//! ```text
//! cargo run --bin dashboard -- --horizon 21 --interval 0.9
//! cargo run --bin dashboard -- --variant monthly --export forecast.csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use eth_outlook::{build_source, init_logging, load_config, render_dashboard, SourceKind};
use price_forecast::config::{DashboardVariant, MAX_WINDOW_DAYS};
use price_forecast::data::DataLoader;
use price_forecast::service::{ForecastRequest, ForecastService};
use price_forecast::store::StoreReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Forecast close prices with the tuned model")]
struct Args {
    /// Days to forecast, defaults to 14 (weekly) or 60 (monthly)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_WINDOW_DAYS))]
    horizon: Option<u32>,

    /// Interval width, one of the variant's choices
    #[arg(long)]
    interval: Option<f64>,

    /// Dashboard flavour: weekly or monthly
    #[arg(long, default_value = "weekly")]
    variant: DashboardVariant,

    /// Directory written by the tune binary
    #[arg(long, env = "OUTLOOK_STORE_DIR", default_value = "store")]
    store_dir: PathBuf,

    /// Pipeline config as JSON, for the symbol and history start
    #[arg(long)]
    config: Option<PathBuf>,

    /// Price history source
    #[arg(long, value_enum, default_value_t = SourceKind::Yahoo)]
    source: SourceKind,

    /// CSV file for --source csv
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also write the forecast to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let variant = args.variant;
    let request = ForecastRequest::new(
        args.horizon.map(|h| h as usize).unwrap_or(variant.default_horizon()),
        args.interval.unwrap_or(variant.default_interval()),
        variant,
    )?;

    let config = load_config(args.config.as_deref())?;
    let source = build_source(args.source, args.csv.as_deref())?;
    let loader = DataLoader::from_config(source, &config);
    let series = loader.load().context("loading price history")?;

    let service = ForecastService::new(StoreReader::new(&args.store_dir), loader);
    let view = service
        .forecast_on(&series, &request)
        .context("building forecast")?;

    print!("{}", render_dashboard(&view, &series, args.source.label()));

    if let Some(path) = &args.export {
        view.forecast
            .write_csv(path)
            .with_context(|| format!("exporting forecast to {}", path.display()))?;
        eprintln!("Forecast written to {}", path.display());
    }

    Ok(())
}
