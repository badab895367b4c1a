//! Shared command line plumbing for the binaries

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use price_forecast::config::PipelineConfig;
use price_forecast::sources::{CsvSource, PriceSource, SyntheticSource, YahooSource};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Where price history comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Yahoo Finance chart API
    Yahoo,
    /// Local CSV export, needs --csv
    Csv,
    /// Seeded synthetic series
    Synthetic,
}

impl SourceKind {
    /// Attribution shown under the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Yahoo => "Yahoo Finance",
            SourceKind::Csv => "local CSV export",
            SourceKind::Synthetic => "synthetic series",
        }
    }
}

/// Build the price source chosen on the command line
pub fn build_source(kind: SourceKind, csv: Option<&Path>) -> Result<Box<dyn PriceSource>> {
    match kind {
        SourceKind::Yahoo => Ok(Box::new(YahooSource::new())),
        SourceKind::Csv => match csv {
            Some(path) => Ok(Box::new(CsvSource::new(path))),
            None => bail!("--source csv needs --csv <path>"),
        },
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::default())),
    }
}

/// Map a `--log-level` value to a tracing level, unknown values mean info
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global fmt subscriber, logging to stderr
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Pipeline config from a JSON file, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("debug", Level::DEBUG)]
    #[case("WARN", Level::WARN)]
    #[case("loud", Level::INFO)]
    fn test_parse_level(#[case] input: &str, #[case] expected: Level) {
        assert_eq!(parse_level(input), expected);
    }

    #[test]
    fn test_csv_source_needs_path() {
        assert!(build_source(SourceKind::Csv, None).is_err());
        let source = build_source(SourceKind::Csv, Some(Path::new("prices.csv"))).unwrap();
        assert_eq!(source.name(), "csv");
        assert_eq!(build_source(SourceKind::Synthetic, None).unwrap().name(), "synthetic");
    }

    #[test]
    fn test_default_config_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.symbol, "ETH-USD");
        assert!(load_config(Some(Path::new("no_such_config.json"))).is_err());
    }
}
