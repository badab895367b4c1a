//! Grid search over the model's prior scales
//!
//! Every grid point is scored by the MAE of a cross-validation at fixed
//! cutoffs; a grid point the model cannot fit fails the whole run. Evaluations are independent, so they
//! can run on the rayon pool; results keep grid order either way and the
//! lowest score wins, earliest grid point first on ties.

use crate::config::{ParamGrid, PipelineConfig};
use crate::data::TimeSeries;
use crate::diagnostics::{cross_validation, performance_metrics, CutoffPlan};
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ParameterSet, SeasonalityMode, TrendSeasonalModel};
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Score of one grid point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridEvaluation {
    pub parameters: ParameterSet,
    pub mae: f64,
}

/// All grid scores in generation order plus the winner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    pub evaluations: Vec<GridEvaluation>,
    pub best_index: usize,
}

impl TuningReport {
    pub fn best(&self) -> &GridEvaluation {
        &self.evaluations[self.best_index]
    }

    pub fn best_parameters(&self) -> ParameterSet {
        self.best().parameters
    }
}

/// Model used to score a grid point
pub fn tuning_model(params: &ParameterSet) -> Result<TrendSeasonalModel> {
    Ok(TrendSeasonalModel::new(params)?.with_seasonality_mode(SeasonalityMode::Multiplicative))
}

/// Index of the lowest non-NaN score, earliest on ties
pub fn select_best(evaluations: &[GridEvaluation]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, evaluation) in evaluations.iter().enumerate() {
        if evaluation.mae.is_nan() {
            continue;
        }
        match best {
            Some(b) if evaluations[b].mae <= evaluation.mae => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Grid-search tuner
#[derive(Debug, Clone)]
pub struct Tuner {
    grid: ParamGrid,
    cutoffs: Vec<NaiveDate>,
    horizon: Duration,
    rolling_window: f64,
    parallel: bool,
}

impl Tuner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            grid: config.param_grid.clone(),
            cutoffs: config.cutoffs.clone(),
            horizon: config.cv_horizon(),
            rolling_window: config.tuning_rolling_window,
            parallel: config.parallel,
        }
    }

    /// Run on a single thread regardless of configuration
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Tune the multiplicative trend + seasonality model
    pub fn tune(&self, series: &TimeSeries) -> Result<TuningReport> {
        self.tune_with(series, tuning_model)
    }

    /// Tune any model built from a parameter set
    pub fn tune_with<M, F>(&self, series: &TimeSeries, build: F) -> Result<TuningReport>
    where
        M: ForecastModel,
        F: Fn(&ParameterSet) -> Result<M> + Sync,
    {
        if self.grid.is_empty() {
            return Err(ForecastError::Config(
                "parameter grid must have at least one value on each axis".to_string(),
            ));
        }
        let combinations = self.grid.combinations()?;
        let plan = CutoffPlan::Explicit(self.cutoffs.clone());
        info!(
            combinations = combinations.len(),
            cutoffs = self.cutoffs.len(),
            parallel = self.parallel,
            "tuning prior scales"
        );

        let evaluate = |params: &ParameterSet| -> Result<GridEvaluation> {
            let model = build(params)?;
            let rows = cross_validation(&model, series, &plan, self.horizon)?;
            let metrics = performance_metrics(&rows, self.rolling_window)?;
            let mae = metrics.first().map(|m| m.mae).unwrap_or(f64::NAN);
            debug!(
                changepoint_prior_scale = params.changepoint_prior_scale,
                seasonality_prior_scale = params.seasonality_prior_scale,
                mae,
                "grid point scored"
            );
            Ok(GridEvaluation {
                parameters: *params,
                mae,
            })
        };

        let evaluations: Vec<GridEvaluation> = if self.parallel {
            combinations.par_iter().map(evaluate).collect::<Result<_>>()?
        } else {
            combinations.iter().map(evaluate).collect::<Result<_>>()?
        };

        let best_index = select_best(&evaluations).ok_or_else(|| {
            ForecastError::ModelFitFailure("every grid point scored NaN".to_string())
        })?;
        let best = &evaluations[best_index];
        info!(
            changepoint_prior_scale = best.parameters.changepoint_prior_scale,
            seasonality_prior_scale = best.parameters.seasonality_prior_scale,
            mae = best.mae,
            "best parameters selected"
        );

        Ok(TuningReport {
            evaluations,
            best_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(mae: f64) -> GridEvaluation {
        GridEvaluation {
            parameters: ParameterSet::new(0.1, 1.0).unwrap(),
            mae,
        }
    }

    #[test]
    fn test_select_best_prefers_first_on_ties() {
        let evals = vec![evaluation(3.0), evaluation(1.0), evaluation(1.0), evaluation(2.0)];
        assert_eq!(select_best(&evals), Some(1));
    }

    #[test]
    fn test_select_best_skips_nan() {
        let evals = vec![evaluation(f64::NAN), evaluation(5.0), evaluation(f64::NAN)];
        assert_eq!(select_best(&evals), Some(1));
        assert_eq!(select_best(&[evaluation(f64::NAN)]), None);
        assert_eq!(select_best(&[]), None);
    }
}
