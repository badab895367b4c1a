//! User-facing accuracy summary
//!
//! The outlook is the first few rows of the horizon metrics of a rolling
//! cross-validation, restated as "average dollar error" and "accuracy
//! percent" and rounded to cents.

use crate::config::PipelineConfig;
use crate::data::TimeSeries;
use crate::diagnostics::{cross_validation, performance_metrics, CutoffPlan, PerformanceRow};
use crate::error::{ForecastError, Result};
use crate::models::{
    ForecastModel, ParameterSet, SeasonalityMode, SeasonalityToggle, TrendSeasonalModel,
};
use chrono::Duration;
use forecast_math::stats::round_to;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Interval width used for the persisted outlook model
pub const OUTLOOK_INTERVAL_WIDTH: f64 = 0.95;

/// One horizon of the outlook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlookRow {
    /// Display label such as "7 days"
    pub horizon: String,
    /// Mean absolute error in quote currency
    pub dollar_error: f64,
    /// `100 - MAPE * 100`
    pub accuracy_percent: f64,
}

/// Ordered outlook rows, shortest horizon first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutlookTable {
    pub rows: Vec<OutlookRow>,
}

fn horizon_label(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

impl OutlookTable {
    /// Keep the first `limit` metric rows and restate them for display
    pub fn from_metrics(metrics: &[PerformanceRow], limit: usize) -> Result<Self> {
        let rows = metrics
            .iter()
            .take(limit)
            .map(|m| {
                let mape = m.mape.ok_or_else(|| {
                    ForecastError::InvalidParameter(
                        "MAPE is undefined when actual prices touch zero".to_string(),
                    )
                })?;
                Ok(OutlookRow {
                    horizon: horizon_label(m.horizon_days),
                    dollar_error: round_to(m.mae, 2),
                    accuracy_percent: round_to(100.0 - mape * 100.0, 2),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for OutlookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} {:>18} {:>13}", "Horizon", "+/- Dollars (USD)", "Accuracy (%)")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<10} {:>18.2} {:>13.2}",
                row.horizon, row.dollar_error, row.accuracy_percent
            )?;
        }
        Ok(())
    }
}

/// Model refit with tuned parameters before the outlook is measured
pub fn outlook_model(params: &ParameterSet) -> Result<TrendSeasonalModel> {
    TrendSeasonalModel::new(params)?
        .with_seasonality_mode(SeasonalityMode::Multiplicative)
        .with_yearly_seasonality(SeasonalityToggle::Enabled)
        .with_interval_width(OUTLOOK_INTERVAL_WIDTH)
}

/// Rolling cross-validation reduced to an [`OutlookTable`]
#[derive(Debug, Clone)]
pub struct OutlookBuilder {
    initial: Duration,
    period: Duration,
    horizon: Duration,
    rolling_window: f64,
    row_limit: usize,
}

impl OutlookBuilder {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            initial: config.cv_initial(),
            period: config.cv_period(),
            horizon: config.cv_horizon(),
            rolling_window: config.outlook_rolling_window,
            row_limit: config.outlook_row_limit,
        }
    }

    /// Horizon metrics of a rolling cross-validation
    pub fn metrics<M: ForecastModel>(
        &self,
        model: &M,
        series: &TimeSeries,
    ) -> Result<Vec<PerformanceRow>> {
        let plan = CutoffPlan::Rolling {
            initial: self.initial,
            period: self.period,
        };
        let rows = cross_validation(model, series, &plan, self.horizon)?;
        info!(rows = rows.len(), "rolling cross-validation finished");
        performance_metrics(&rows, self.rolling_window)
    }

    pub fn build<M: ForecastModel>(&self, model: &M, series: &TimeSeries) -> Result<OutlookTable> {
        let metrics = self.metrics(model, series)?;
        OutlookTable::from_metrics(&metrics, self.row_limit)
    }
}
