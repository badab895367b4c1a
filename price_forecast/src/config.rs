//! Pipeline and dashboard configuration
//!
//! Everything the tuning job and the dashboard used to hard-code lives here:
//! the symbol and history start, the tuning grid and cutoffs, the
//! cross-validation windows and the outlook size. A config is built once at
//! startup, validated, and passed by reference to every stage.

use crate::error::{ForecastError, Result};
use crate::models::ParameterSet;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Longest window, in days, accepted for cross-validation or a forecast horizon
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Candidate values for the two tuned prior scales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub changepoint_prior_scale: Vec<f64>,
    pub seasonality_prior_scale: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: vec![0.001, 0.01, 0.1, 0.5],
            seasonality_prior_scale: vec![0.01, 0.1, 1.0, 10.0],
        }
    }
}

impl ParamGrid {
    /// Cross product of the grid, changepoint scale as the outer loop
    pub fn combinations(&self) -> Result<Vec<ParameterSet>> {
        let mut out = Vec::with_capacity(self.len());
        for &cps in &self.changepoint_prior_scale {
            for &sps in &self.seasonality_prior_scale {
                out.push(ParameterSet::new(cps, sps)?);
            }
        }
        Ok(out)
    }

    /// Number of combinations
    pub fn len(&self) -> usize {
        self.changepoint_prior_scale.len() * self.seasonality_prior_scale.len()
    }

    /// True when either axis is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settings for the tuning job and the cross-validation behind the outlook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upstream ticker symbol
    pub symbol: String,
    /// First day of history requested from the source
    pub start_date: NaiveDate,
    /// Simulated "present" dates used while tuning
    pub cutoffs: Vec<NaiveDate>,
    /// Grid searched by the tuner
    pub param_grid: ParamGrid,
    /// Minimum training window before the first rolling cutoff
    pub cv_initial_days: i64,
    /// Spacing between rolling cutoffs
    pub cv_period_days: i64,
    /// Evaluation horizon after each cutoff
    pub cv_horizon_days: i64,
    /// Rolling window used to score grid points (1.0 = one aggregate row)
    pub tuning_rolling_window: f64,
    /// Rolling window used for the outlook metrics
    pub outlook_rolling_window: f64,
    /// Number of horizon rows kept in the outlook
    pub outlook_row_limit: usize,
    /// Evaluate grid points on a thread pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        Self {
            symbol: "ETH-USD".to_string(),
            start_date: date(2016, 1, 1),
            cutoffs: vec![
                date(2018, 1, 1),
                date(2018, 4, 1),
                date(2019, 1, 1),
                date(2020, 1, 1),
            ],
            param_grid: ParamGrid::default(),
            cv_initial_days: 730,
            cv_period_days: 30,
            cv_horizon_days: 60,
            tuning_rolling_window: 1.0,
            outlook_rolling_window: 0.1,
            outlook_row_limit: 9,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Read a config from a JSON file, missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ForecastError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field for a usable value
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(ForecastError::Config("symbol must not be empty".to_string()));
        }
        if self.cutoffs.is_empty() {
            return Err(ForecastError::Config(
                "at least one tuning cutoff is required".to_string(),
            ));
        }
        if self.param_grid.is_empty() {
            return Err(ForecastError::Config(
                "parameter grid must have at least one value on each axis".to_string(),
            ));
        }
        self.param_grid
            .combinations()
            .map_err(|e| ForecastError::Config(e.to_string()))?;
        for (name, days) in [
            ("cv_initial_days", self.cv_initial_days),
            ("cv_period_days", self.cv_period_days),
            ("cv_horizon_days", self.cv_horizon_days),
        ] {
            if days <= 0 || days > MAX_WINDOW_DAYS {
                return Err(ForecastError::Config(format!(
                    "{} must be between 1 and {} days, got {}",
                    name, MAX_WINDOW_DAYS, days
                )));
            }
        }
        for window in [self.tuning_rolling_window, self.outlook_rolling_window] {
            if !(window > 0.0 && window.is_finite()) {
                return Err(ForecastError::Config(format!(
                    "rolling window must be positive, got {}",
                    window
                )));
            }
        }
        if self.outlook_row_limit == 0 {
            return Err(ForecastError::Config(
                "outlook_row_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cv_initial(&self) -> Duration {
        Duration::days(self.cv_initial_days)
    }

    pub fn cv_period(&self) -> Duration {
        Duration::days(self.cv_period_days)
    }

    pub fn cv_horizon(&self) -> Duration {
        Duration::days(self.cv_horizon_days)
    }
}

/// The two dashboard deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DashboardVariant {
    /// Two-week default horizon with a selectable interval width
    #[default]
    Weekly,
    /// Sixty-day default horizon with the interval fixed at 95%
    Monthly,
}

const SELECTABLE_INTERVALS: [f64; 5] = [0.80, 0.85, 0.90, 0.95, 0.99];
const FIXED_INTERVAL: [f64; 1] = [0.95];

impl DashboardVariant {
    pub fn default_horizon(&self) -> usize {
        match self {
            DashboardVariant::Weekly => 14,
            DashboardVariant::Monthly => 60,
        }
    }

    /// Increment suggested for the horizon input
    pub fn horizon_step(&self) -> usize {
        match self {
            DashboardVariant::Weekly => 7,
            DashboardVariant::Monthly => 30,
        }
    }

    /// Interval widths offered by this variant
    pub fn interval_choices(&self) -> &'static [f64] {
        match self {
            DashboardVariant::Weekly => &SELECTABLE_INTERVALS,
            DashboardVariant::Monthly => &FIXED_INTERVAL,
        }
    }

    pub fn default_interval(&self) -> f64 {
        0.95
    }

    /// Accept `width` only if it is one of the offered choices
    pub fn check_interval(&self, width: f64) -> Result<f64> {
        self.interval_choices()
            .iter()
            .copied()
            .find(|choice| (choice - width).abs() < 1e-9)
            .ok_or_else(|| {
                ForecastError::InvalidParameter(format!(
                    "interval width {} is not offered by the {} dashboard (choices: {:?})",
                    width, self, self.interval_choices()
                ))
            })
    }
}

impl fmt::Display for DashboardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardVariant::Weekly => write!(f, "weekly"),
            DashboardVariant::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for DashboardVariant {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "weekly" | "14" => Ok(DashboardVariant::Weekly),
            "monthly" | "60" => Ok(DashboardVariant::Monthly),
            other => Err(ForecastError::Config(format!(
                "unknown dashboard variant '{}', expected weekly or monthly",
                other
            ))),
        }
    }
}
