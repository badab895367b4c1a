//! Rolling-origin cross-validation and horizon metrics
//!
//! Each cutoff plays the role of "today": a fresh model is trained on rows up
//! to the cutoff and scored on the rows that follow it, up to the horizon.
//! [`performance_metrics`] then summarises the pooled errors by how far past
//! the cutoff each prediction was made.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrainedForecastModel};
use chrono::{Duration, NaiveDate};
use forecast_math::stats::rolling_mean_by_group;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Values this close to zero make percentage errors meaningless
const MAPE_EPSILON: f64 = 1e-8;

/// How the cutoff dates are chosen
#[derive(Debug, Clone, PartialEq)]
pub enum CutoffPlan {
    /// Fixed simulated "present" dates
    Explicit(Vec<NaiveDate>),
    /// Cutoffs every `period`, leaving at least `initial` of training history
    Rolling { initial: Duration, period: Duration },
}

/// One held-out prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationRow {
    pub ds: NaiveDate,
    pub cutoff: NaiveDate,
    pub y: f64,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

impl CrossValidationRow {
    /// Whole days between the cutoff and the predicted date
    pub fn horizon_days(&self) -> i64 {
        (self.ds - self.cutoff).num_days()
    }
}

/// Error summary for one horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub horizon_days: i64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Fraction, absent when some actual value is zero
    pub mape: Option<f64>,
    pub coverage: f64,
}

/// Cutoffs spaced `period` apart, ending one horizon before the last date
pub fn generate_cutoffs(
    series: &TimeSeries,
    horizon: Duration,
    initial: Duration,
    period: Duration,
) -> Result<Vec<NaiveDate>> {
    let (first, last) = match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(ForecastError::InvalidParameter(
                "Cannot generate cutoffs for an empty series".to_string(),
            ))
        }
    };
    if period <= Duration::zero() || horizon <= Duration::zero() {
        return Err(ForecastError::InvalidParameter(
            "Cutoff period and horizon must be positive".to_string(),
        ));
    }

    let out_of_range = || {
        ForecastError::InvalidParameter(format!(
            "Cutoff windows of {} + {} days fall outside the calendar",
            initial.num_days(),
            horizon.num_days()
        ))
    };
    let earliest = first.checked_add_signed(initial).ok_or_else(out_of_range)?;
    let mut cutoff = last.checked_sub_signed(horizon).ok_or_else(out_of_range)?;
    let mut cutoffs = Vec::new();
    while cutoff >= earliest {
        cutoffs.push(cutoff);
        match cutoff.checked_sub_signed(period) {
            Some(previous) => cutoff = previous,
            None => break,
        }
    }
    if cutoffs.is_empty() {
        return Err(ForecastError::InvalidParameter(format!(
            "Less data than initial window plus horizon: {} to {} cannot hold {} + {} days",
            first,
            last,
            initial.num_days(),
            horizon.num_days()
        )));
    }

    cutoffs.reverse();
    Ok(cutoffs)
}

fn resolve_cutoffs(series: &TimeSeries, plan: &CutoffPlan, horizon: Duration) -> Result<Vec<NaiveDate>> {
    match plan {
        CutoffPlan::Rolling { initial, period } => {
            generate_cutoffs(series, horizon, *initial, *period)
        }
        CutoffPlan::Explicit(cutoffs) => {
            let (first, last) = match (series.first_date(), series.last_date()) {
                (Some(first), Some(last)) => (first, last),
                _ => {
                    return Err(ForecastError::InvalidParameter(
                        "Cannot cross-validate an empty series".to_string(),
                    ))
                }
            };
            if cutoffs.is_empty() {
                return Err(ForecastError::InvalidParameter(
                    "At least one cutoff is required".to_string(),
                ));
            }
            if let Some(bad) = cutoffs.iter().find(|c| **c <= first || **c >= last) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Cutoff {} must fall strictly inside the history {} to {}",
                    bad, first, last
                )));
            }
            let mut sorted = cutoffs.clone();
            sorted.sort();
            sorted.dedup();
            Ok(sorted)
        }
    }
}

/// Train on `ds <= cutoff` and predict `cutoff < ds <= cutoff + horizon` for every cutoff
pub fn cross_validation<M: ForecastModel>(
    model: &M,
    series: &TimeSeries,
    plan: &CutoffPlan,
    horizon: Duration,
) -> Result<Vec<CrossValidationRow>> {
    if horizon <= Duration::zero() {
        return Err(ForecastError::InvalidParameter(
            "Cross-validation horizon must be positive".to_string(),
        ));
    }
    let cutoffs = resolve_cutoffs(series, plan, horizon)?;
    debug!(model = model.name(), cutoffs = cutoffs.len(), "cross-validating");

    let mut rows = Vec::new();
    for cutoff in cutoffs {
        let train = series.slice_until(cutoff);
        let until = cutoff.checked_add_signed(horizon).unwrap_or(NaiveDate::MAX);
        let test = series.window(cutoff, until);
        if test.is_empty() {
            continue;
        }

        let trained = model.train(&train)?;
        let forecast = trained.predict(test.dates())?;
        for (point, &y) in forecast.points().iter().zip(test.values()) {
            rows.push(CrossValidationRow {
                ds: point.date,
                cutoff,
                y,
                yhat: point.yhat,
                yhat_lower: point.yhat_lower,
                yhat_upper: point.yhat_upper,
            });
        }
    }

    if rows.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "No rows fall inside any cutoff horizon".to_string(),
        ));
    }
    Ok(rows)
}

/// Rolling error metrics by horizon
///
/// `rolling_window` is the share of all rows averaged into each output row;
/// 1.0 or more collapses everything into a single row at the largest horizon.
pub fn performance_metrics(
    rows: &[CrossValidationRow],
    rolling_window: f64,
) -> Result<Vec<PerformanceRow>> {
    if rows.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "No cross-validation rows to summarise".to_string(),
        ));
    }
    if !(rolling_window > 0.0 && rolling_window.is_finite()) {
        return Err(ForecastError::InvalidParameter(format!(
            "Rolling window must be positive, got {}",
            rolling_window
        )));
    }

    let n = rows.len();
    let window = ((rolling_window * n as f64).floor() as usize).clamp(1, n);
    let horizons: Vec<i64> = rows.iter().map(|r| r.horizon_days()).collect();

    let squared: Vec<f64> = rows.iter().map(|r| (r.y - r.yhat).powi(2)).collect();
    let absolute: Vec<f64> = rows.iter().map(|r| (r.y - r.yhat).abs()).collect();
    let covered: Vec<f64> = rows
        .iter()
        .map(|r| {
            if r.yhat_lower <= r.y && r.y <= r.yhat_upper {
                1.0
            } else {
                0.0
            }
        })
        .collect();

    let (keys, mse) = rolling_mean_by_group(&squared, &horizons, window)?;
    let (_, mae) = rolling_mean_by_group(&absolute, &horizons, window)?;
    let (_, coverage) = rolling_mean_by_group(&covered, &horizons, window)?;
    let mape = if rows.iter().any(|r| r.y.abs() < MAPE_EPSILON) {
        None
    } else {
        let percentage: Vec<f64> = rows.iter().map(|r| ((r.y - r.yhat) / r.y).abs()).collect();
        Some(rolling_mean_by_group(&percentage, &horizons, window)?.1)
    };

    Ok(keys
        .iter()
        .enumerate()
        .map(|(i, &horizon_days)| PerformanceRow {
            horizon_days,
            mse: mse[i],
            rmse: mse[i].sqrt(),
            mae: mae[i],
            mape: mape.as_ref().map(|m| m[i]),
            coverage: coverage[i],
        })
        .collect())
}
