//! Upstream price sources
//!
//! The loader only needs daily OHLC bars for a symbol and an inclusive date
//! range. [`YahooSource`] talks to the public chart API, [`CsvSource`] reads
//! an exported file for offline runs and [`SyntheticSource`] generates a
//! reproducible series for demos and tests.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One upstream daily bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Anything that can produce daily bars for a symbol
pub trait PriceSource: Send + Sync {
    /// Bars for `symbol` with `start <= date <= end`, in any order
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>>;

    /// Short label for logs
    fn name(&self) -> &str;
}

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance v8 chart API
#[derive(Debug, Clone)]
pub struct YahooSource {
    base_url: String,
}

impl Default for YahooSource {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooSource {
    pub fn new() -> Self {
        Self {
            base_url: YAHOO_CHART_URL.to_string(),
        }
    }

    /// Point the client at another chart endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn build_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        // period2 is exclusive upstream
        let period2 = (end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
            .timestamp();
        format!(
            "{}/{}?period1={}&period2={}&interval=1d",
            self.base_url, symbol, period1, period2
        )
    }

    /// Decode a chart payload into bars, skipping rows without a close
    pub fn parse_response(json: &str) -> Result<Vec<DailyBar>> {
        let response: ChartResponse = serde_json::from_str(json)
            .map_err(|e| ForecastError::DataUnavailable(format!("bad chart payload: {}", e)))?;

        if let Some(error) = response.chart.error {
            return Err(ForecastError::DataUnavailable(format!(
                "chart API error [{}]: {}",
                error.code, error.description
            )));
        }

        let data = response
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ForecastError::DataUnavailable("chart API returned no result".to_string()))?;
        let quote = data
            .indicators
            .quote
            .first()
            .ok_or_else(|| ForecastError::DataUnavailable("chart API returned no quotes".to_string()))?;

        let mut bars = Vec::with_capacity(data.timestamp.len());
        for (i, &ts) in data.timestamp.iter().enumerate() {
            let close = match quote.close.get(i).copied().flatten() {
                Some(c) => c,
                None => continue,
            };
            let date = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| ForecastError::DataUnavailable(format!("bad timestamp {}", ts)))?
                .date_naive();
            let field = |col: &Vec<Option<f64>>| col.get(i).copied().flatten().unwrap_or(close);
            bars.push(DailyBar {
                date,
                open: field(&quote.open),
                high: field(&quote.high),
                low: field(&quote.low),
                close,
            });
        }

        Ok(bars)
    }
}

impl PriceSource for YahooSource {
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
        let url = self.build_url(symbol, start, end);
        debug!(%url, "requesting chart");

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ForecastError::DataUnavailable(e.to_string()))?;
        let response = client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ForecastError::DataUnavailable(format!("request failed: {}", e)))?;
        let text = response
            .text()
            .map_err(|e| ForecastError::DataUnavailable(format!("reading body failed: {}", e)))?;

        let bars = Self::parse_response(&text)?;
        info!(symbol, bars = bars.len(), "fetched daily bars");
        Ok(bars)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "ds")]
    date: NaiveDate,
    #[serde(alias = "Open", default, deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(alias = "High", default, deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(alias = "Low", default, deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(alias = "Close", alias = "y", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
}

/// Daily bars from a local CSV export
///
/// The header must name `date` and `close`; `open`, `high` and `low` are
/// optional and extra columns are ignored. Rows whose close is missing or
/// unparseable (Yahoo writes `null`) are skipped.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PriceSource for CsvSource {
    fn fetch(&self, _symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| {
            ForecastError::DataUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let mut bars = Vec::new();
        for record in reader.deserialize() {
            let record: CsvRecord = record.map_err(|e| {
                ForecastError::DataUnavailable(format!("{}: {}", self.path.display(), e))
            })?;
            let close = match record.close {
                Some(c) => c,
                None => continue,
            };
            if record.date < start || record.date > end {
                continue;
            }
            bars.push(DailyBar {
                date: record.date,
                open: record.open.unwrap_or(close),
                high: record.high.unwrap_or(close),
                low: record.low.unwrap_or(close),
                close,
            });
        }

        info!(path = %self.path.display(), bars = bars.len(), "read daily bars");
        Ok(bars)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Seeded random walk with yearly and weekly swings
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    base_price: f64,
    daily_drift: f64,
    volatility: f64,
    yearly_amplitude: f64,
    weekly_amplitude: f64,
    /// Drop every n-th day to mimic missing upstream rows
    gap_every: Option<usize>,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(42)
    }
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            base_price: 1000.0,
            daily_drift: 0.0005,
            volatility: 0.02,
            yearly_amplitude: 0.15,
            weekly_amplitude: 0.01,
            gap_every: None,
        }
    }

    pub fn with_gaps(mut self, every: usize) -> Self {
        self.gap_every = if every > 1 { Some(every) } else { None };
        self
    }

    /// Generate bars for every day in `[start, end]`, minus any gaps
    pub fn generate(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
        let noise = Normal::new(self.daily_drift, self.volatility)
            .map_err(|e| ForecastError::InvalidParameter(format!("synthetic noise: {}", e)))?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut level = self.base_price;
        let mut bars = Vec::new();
        for (i, date) in start.iter_days().take_while(|d| *d <= end).enumerate() {
            level *= noise.sample(&mut rng).exp();
            let t = i as f64;
            let season = 1.0
                + self.yearly_amplitude * (2.0 * PI * t / 365.25).sin()
                + self.weekly_amplitude * (2.0 * PI * t / 7.0).cos();
            let close = level * season;

            if matches!(self.gap_every, Some(n) if i % n == n - 1) {
                continue;
            }

            let spread = close * self.volatility * rng.gen::<f64>();
            bars.push(DailyBar {
                date,
                open: close - spread * 0.5,
                high: close + spread,
                low: close - spread,
                close,
            });
        }

        Ok(bars)
    }
}

impl PriceSource for SyntheticSource {
    fn fetch(&self, _symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
        self.generate(start, end)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CHART_FIXTURE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "ETH-USD"},
                "timestamp": [1672531200, 1672617600, 1672704000],
                "indicators": {
                    "quote": [{
                        "open": [1196.7, 1200.9, null],
                        "high": [1203.5, 1219.8, null],
                        "low": [1192.9, 1195.2, null],
                        "close": [1200.9, 1214.7, null],
                        "volume": [2399674550, 3765758498, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_response() {
        let bars = YahooSource::parse_response(CHART_FIXTURE).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(bars[1].close, 1214.7);
    }

    #[test]
    fn test_parse_chart_error() {
        let json = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}}"#;
        let err = YahooSource::parse_response(json).unwrap_err();
        assert!(matches!(err, ForecastError::DataUnavailable(_)));
        assert!(err.to_string().contains("No data found"));

        assert!(YahooSource::parse_response("<html>").is_err());
    }

    #[test]
    fn test_url_end_is_inclusive() {
        let source = YahooSource::with_base_url("http://localhost");
        let url = source.build_url(
            "ETH-USD",
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
        );
        assert_eq!(
            url,
            "http://localhost/ETH-USD?period1=1672531200&period2=1672704000&interval=1d"
        );
    }

    #[test]
    fn test_synthetic_is_reproducible() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let a = SyntheticSource::new(7).generate(start, end).unwrap();
        let b = SyntheticSource::new(7).generate(start, end).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 61);
        assert!(a.iter().all(|bar| bar.close > 0.0 && bar.low <= bar.high));
    }

    #[test]
    fn test_synthetic_gaps() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 1, 10).unwrap();
        let bars = SyntheticSource::new(1).with_gaps(5).generate(start, end).unwrap();
        assert_eq!(bars.len(), 8);
    }
}
