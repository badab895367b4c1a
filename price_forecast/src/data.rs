//! Daily price history for forecasting
//!
//! A [`DataLoader`] pulls raw bars from a [`PriceSource`], keeps the close,
//! lays it onto a complete daily calendar and forward-fills the gaps, giving
//! a [`TimeSeries`] with exactly one row per day.

use crate::config::PipelineConfig;
use crate::error::{ForecastError, Result};
use crate::sources::{DailyBar, PriceSource};
use chrono::{Duration, NaiveDate, Utc};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Ordered `(date, value)` pairs
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series from matching date and value vectors
    ///
    /// Dates must be strictly increasing and values finite.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::InvalidParameter(
                "Dates must be strictly increasing".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "Values must be finite".to_string(),
            ));
        }

        Ok(Self { dates, values })
    }

    /// Create a series of consecutive days starting at `start`
    pub fn daily(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let dates = start.iter_days().take(values.len()).collect();
        Self::new(dates, values)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// True when every pair of neighbouring rows is one day apart
    pub fn is_contiguous(&self) -> bool {
        self.dates
            .windows(2)
            .all(|w| w[1] - w[0] == Duration::days(1))
    }

    /// Rows with `ds <= cutoff`
    pub fn slice_until(&self, cutoff: NaiveDate) -> Self {
        let end = self.dates.partition_point(|d| *d <= cutoff);
        Self {
            dates: self.dates[..end].to_vec(),
            values: self.values[..end].to_vec(),
        }
    }

    /// Rows with `after < ds <= until`
    pub fn window(&self, after: NaiveDate, until: NaiveDate) -> Self {
        let start = self.dates.partition_point(|d| *d <= after);
        let end = self.dates.partition_point(|d| *d <= until).max(start);
        Self {
            dates: self.dates[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }

    /// Two-column frame `ds, y`
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let ds: Vec<String> = self
            .dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect();
        let df = DataFrame::new(vec![
            Series::new("ds", ds),
            Series::new("y", self.values.clone()),
        ])?;
        Ok(df)
    }
}

/// Lay bar closes onto the daily calendar `[start, end]` and forward-fill gaps
///
/// Days before the first observation in range have no prior value and are
/// dropped, so the series starts at the first observed day. Duplicate dates
/// keep the last bar seen.
pub fn forward_fill(bars: &[DailyBar], start: NaiveDate, end: NaiveDate) -> Result<TimeSeries> {
    if end < start {
        return Err(ForecastError::InvalidParameter(format!(
            "End date {} is before start date {}",
            end, start
        )));
    }

    let mut closes = BTreeMap::new();
    for bar in bars {
        if bar.date >= start && bar.date <= end && bar.close.is_finite() {
            closes.insert(bar.date, bar.close);
        }
    }
    let first_observed = closes.keys().next().copied().ok_or_else(|| {
        ForecastError::DataUnavailable(format!(
            "no close prices between {} and {}",
            start, end
        ))
    })?;
    if first_observed > start {
        warn!(%start, %first_observed, "no observations before first trading day, series starts later");
    }

    let calendar: Vec<NaiveDate> = first_observed
        .iter_days()
        .take_while(|d| *d <= end)
        .collect();
    let raw: Vec<Option<f64>> = calendar.iter().map(|d| closes.get(d).copied()).collect();
    let gaps = raw.iter().filter(|v| v.is_none()).count();

    let filled = Series::new("y", raw).fill_null(FillNullStrategy::Forward(None))?;
    let values = filled
        .f64()?
        .into_iter()
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| ForecastError::DataUnavailable("forward fill left gaps".to_string()))?;

    if gaps > 0 {
        info!(gaps, "filled missing days from the previous close");
    }

    TimeSeries::new(calendar, values)
}

/// Data loader for daily close prices
pub struct DataLoader {
    source: Box<dyn PriceSource>,
    symbol: String,
    start_date: NaiveDate,
}

impl std::fmt::Debug for DataLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLoader")
            .field("source", &self.source.name())
            .field("symbol", &self.symbol)
            .field("start_date", &self.start_date)
            .finish()
    }
}

impl DataLoader {
    pub fn new(source: Box<dyn PriceSource>, symbol: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            source,
            symbol: symbol.into(),
            start_date,
        }
    }

    /// Loader for the symbol and start date of a pipeline config
    pub fn from_config(source: Box<dyn PriceSource>, config: &PipelineConfig) -> Self {
        Self::new(source, config.symbol.clone(), config.start_date)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// History up to yesterday
    pub fn load(&self) -> Result<TimeSeries> {
        self.load_as_of(Utc::now().date_naive())
    }

    /// History from the start date up to the day before `today`
    pub fn load_as_of(&self, today: NaiveDate) -> Result<TimeSeries> {
        let end = today - Duration::days(1);
        info!(
            symbol = %self.symbol,
            source = self.source.name(),
            start = %self.start_date,
            %end,
            "loading price history"
        );

        let bars = self.source.fetch(&self.symbol, self.start_date, end)?;
        let series = forward_fill(&bars, self.start_date, end)?;

        info!(rows = series.len(), "price history ready");
        Ok(series)
    }
}
