//! Forecasting models for daily price series
//!
//! Models follow a two-step shape: a [`ForecastModel`] is a configuration
//! that can be trained on a [`TimeSeries`], producing a
//! [`TrainedForecastModel`] that extends the date index and predicts over it.
//! Cross-validation and tuning only talk to these traits.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::path::Path;

pub mod trend_seasonal;

pub use trend_seasonal::{TrainedTrendSeasonal, TrendSeasonalModel};

/// How seasonal terms combine with the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    /// `y = trend + seasonal`
    Additive,
    /// `y = trend * (1 + seasonal)`
    Multiplicative,
}

/// Whether a seasonal component is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityToggle {
    /// Enabled when the history is long enough to identify it
    Auto,
    Enabled,
    Disabled,
}

/// Tuned prior scales, produced by the tuning job and read by every forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Trend flexibility
    pub changepoint_prior_scale: f64,
    /// Seasonal flexibility
    pub seasonality_prior_scale: f64,
    /// Share of history in which changepoints may be placed
    #[serde(default)]
    pub changepoint_range: Option<f64>,
}

impl ParameterSet {
    /// Create a parameter set, both scales must be positive
    pub fn new(changepoint_prior_scale: f64, seasonality_prior_scale: f64) -> Result<Self> {
        let params = Self {
            changepoint_prior_scale,
            seasonality_prior_scale,
            changepoint_range: None,
        };
        params.validate()?;
        Ok(params)
    }

    /// Restrict changepoints to the first `range` of the history
    pub fn with_changepoint_range(mut self, range: f64) -> Result<Self> {
        self.changepoint_range = Some(range);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("changepoint_prior_scale", self.changepoint_prior_scale),
            ("seasonality_prior_scale", self.seasonality_prior_scale),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if let Some(range) = self.changepoint_range {
            if !(range > 0.0 && range <= 1.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "changepoint_range must be in (0, 1], got {}",
                    range
                )));
            }
        }
        Ok(())
    }
}

/// One predicted date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Predictions over history plus any future dates
#[derive(Debug, Clone)]
pub struct ForecastResult {
    points: Vec<ForecastPoint>,
    /// Number of leading points that fall inside the training history
    history_len: usize,
}

impl ForecastResult {
    /// Create a forecast result, points must be in ascending date order
    pub fn new(points: Vec<ForecastPoint>, history_len: usize) -> Result<Self> {
        if history_len > points.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "History length ({}) exceeds number of points ({})",
                history_len,
                points.len()
            )));
        }
        if points.windows(2).any(|w| w[0].date >= w[1].date) {
            return Err(ForecastError::InvalidParameter(
                "Forecast dates must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            points,
            history_len,
        })
    }

    /// All predicted points
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Points inside the training history
    pub fn history(&self) -> &[ForecastPoint] {
        &self.points[..self.history_len]
    }

    /// Points beyond the training history
    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.history_len..]
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Number of predicted dates after the history
    pub fn horizon(&self) -> usize {
        self.points.len() - self.history_len
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point estimates in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.yhat).collect()
    }

    /// Calculate mean absolute error between point estimates and actual values
    pub fn mean_absolute_error(&self, actual: &[f64]) -> Result<f64> {
        if self.points.len() != actual.len() || actual.is_empty() {
            return Err(ForecastError::InvalidParameter(format!(
                "Forecast length ({}) doesn't match actual length ({})",
                self.points.len(),
                actual.len()
            )));
        }

        let sum: f64 = self
            .points
            .iter()
            .zip(actual.iter())
            .map(|(p, a)| (p.yhat - a).abs())
            .sum();

        Ok(sum / actual.len() as f64)
    }

    /// Columns `ds, yhat, yhat_lower, yhat_upper`
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let ds: Vec<String> = self
            .points
            .iter()
            .map(|p| p.date.format("%Y-%m-%d").to_string())
            .collect();
        let yhat: Vec<f64> = self.points.iter().map(|p| p.yhat).collect();
        let lower: Vec<f64> = self.points.iter().map(|p| p.yhat_lower).collect();
        let upper: Vec<f64> = self.points.iter().map(|p| p.yhat_upper).collect();

        let df = DataFrame::new(vec![
            Series::new("ds", ds),
            Series::new("yhat", yhat),
            Series::new("yhat_lower", lower),
            Series::new("yhat_upper", upper),
        ])?;
        Ok(df)
    }

    /// Write the forecast as CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
        Ok(())
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Training dates followed by `periods` consecutive future days
    fn make_future_dates(&self, periods: usize) -> Vec<NaiveDate>;

    /// Predict point estimates and interval bounds for the given dates
    fn predict(&self, dates: &[NaiveDate]) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on time series data
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on time series data
    fn train(&self, data: &TimeSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}
