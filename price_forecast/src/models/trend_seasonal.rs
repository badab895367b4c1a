//! Decomposable trend + seasonality model
//!
//! The trend is continuous and piecewise linear in scaled time, with potential
//! changepoints spread evenly over the first `changepoint_range` of the
//! history. Seasonality is a sum of Fourier terms for a yearly and a weekly
//! period. Coefficients are MAP estimates under Gaussian priors, which makes
//! each fit a ridge regression:
//!
//! - trend slope changes: prior scale `changepoint_prior_scale`
//! - Fourier coefficients: prior scale `seasonality_prior_scale`
//!
//! In multiplicative mode the trend and seasonal parts are fitted in
//! alternation until the decomposition settles. Interval bounds combine the
//! in-sample residual spread with the variance of future trend changes,
//! which grows with the distance past the last training date.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{
    ForecastModel, ForecastPoint, ForecastResult, ParameterSet, SeasonalityMode,
    SeasonalityToggle, TrainedForecastModel,
};
use chrono::{Duration, NaiveDate};
use forecast_math::basis::{changepoint_indices, fourier_features, hinge_features};
use forecast_math::regression::predict_row;
use forecast_math::stats::{abs_max, interval_z};
use forecast_math::RidgeRegression;
use tracing::debug;

const YEARLY_PERIOD: f64 = 365.25;
const WEEKLY_PERIOD: f64 = 7.0;
const YEARLY_ORDER: usize = 10;
const WEEKLY_ORDER: usize = 3;
const DEFAULT_CHANGEPOINTS: usize = 25;
const DEFAULT_CHANGEPOINT_RANGE: f64 = 0.8;
/// Prior scale on the base slope and offset
const TREND_PRIOR_SCALE: f64 = 5.0;
const MULTIPLICATIVE_PASSES: usize = 4;
const SIGMA_FLOOR: f64 = 1e-3;

/// Untrained model configuration
#[derive(Debug, Clone)]
pub struct TrendSeasonalModel {
    name: String,
    seasonality_mode: SeasonalityMode,
    yearly_seasonality: SeasonalityToggle,
    weekly_seasonality: SeasonalityToggle,
    interval_width: f64,
    changepoint_prior_scale: f64,
    seasonality_prior_scale: f64,
    changepoint_range: f64,
    n_changepoints: usize,
}

/// Model fitted to a specific history
#[derive(Debug, Clone)]
pub struct TrainedTrendSeasonal {
    name: String,
    mode: SeasonalityMode,
    interval_z: f64,
    history: Vec<NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
    span_days: f64,
    y_scale: f64,
    knots: Vec<f64>,
    /// `[offset, slope, delta_1, ..., delta_k]`
    trend_coefficients: Vec<f64>,
    yearly: bool,
    weekly: bool,
    seasonal_coefficients: Vec<f64>,
    /// Residual standard deviation in scaled units
    sigma: f64,
    /// Laplace scale of the fitted slope changes
    delta_scale: f64,
}

impl TrendSeasonalModel {
    /// Model with default settings and the given prior scales
    pub fn new(params: &ParameterSet) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            name: format!(
                "Trend+Seasonal (cps={}, sps={})",
                params.changepoint_prior_scale, params.seasonality_prior_scale
            ),
            seasonality_mode: SeasonalityMode::Additive,
            yearly_seasonality: SeasonalityToggle::Auto,
            weekly_seasonality: SeasonalityToggle::Auto,
            interval_width: 0.8,
            changepoint_prior_scale: params.changepoint_prior_scale,
            seasonality_prior_scale: params.seasonality_prior_scale,
            changepoint_range: params.changepoint_range.unwrap_or(DEFAULT_CHANGEPOINT_RANGE),
            n_changepoints: DEFAULT_CHANGEPOINTS,
        })
    }

    pub fn with_seasonality_mode(mut self, mode: SeasonalityMode) -> Self {
        self.seasonality_mode = mode;
        self
    }

    pub fn with_yearly_seasonality(mut self, toggle: SeasonalityToggle) -> Self {
        self.yearly_seasonality = toggle;
        self
    }

    pub fn with_weekly_seasonality(mut self, toggle: SeasonalityToggle) -> Self {
        self.weekly_seasonality = toggle;
        self
    }

    /// Width of the predicted uncertainty band, in (0, 1)
    pub fn with_interval_width(mut self, width: f64) -> Result<Self> {
        interval_z(width)?;
        self.interval_width = width;
        Ok(self)
    }

    pub fn with_changepoints(mut self, count: usize) -> Self {
        self.n_changepoints = count;
        self
    }

    fn resolve(toggle: SeasonalityToggle, span_days: f64, needed_days: f64) -> bool {
        match toggle {
            SeasonalityToggle::Enabled => true,
            SeasonalityToggle::Disabled => false,
            SeasonalityToggle::Auto => span_days >= needed_days,
        }
    }

    fn trend_penalties(&self, knots: usize, sigma: f64) -> Vec<f64> {
        let var = sigma * sigma;
        // Laplace(0, s) has variance 2 s^2
        let delta_var = 2.0 * self.changepoint_prior_scale.powi(2);
        let mut penalties = vec![var / TREND_PRIOR_SCALE.powi(2); 2];
        penalties.extend(std::iter::repeat(var / delta_var).take(knots));
        penalties
    }

    fn seasonal_penalties(&self, columns: usize, sigma: f64) -> Vec<f64> {
        vec![sigma * sigma / self.seasonality_prior_scale.powi(2); columns]
    }
}

/// Scaled time, days-since-epoch and trend/seasonal columns for a set of dates
struct Design {
    t: Vec<f64>,
    trend: Vec<Vec<f64>>,
    seasonal: Vec<Vec<f64>>,
}

fn build_design(
    dates: &[NaiveDate],
    start: NaiveDate,
    span_days: f64,
    knots: &[f64],
    yearly: bool,
    weekly: bool,
) -> Result<Design> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let t: Vec<f64> = dates
        .iter()
        .map(|d| (*d - start).num_days() as f64 / span_days)
        .collect();
    let days: Vec<f64> = dates
        .iter()
        .map(|d| (*d - epoch).num_days() as f64)
        .collect();

    let mut trend = Vec::with_capacity(2 + knots.len());
    trend.push(vec![1.0; t.len()]);
    trend.push(t.clone());
    trend.extend(hinge_features(&t, knots));

    let mut seasonal = Vec::new();
    if yearly {
        seasonal.extend(fourier_features(&days, YEARLY_PERIOD, YEARLY_ORDER)?);
    }
    if weekly {
        seasonal.extend(fourier_features(&days, WEEKLY_PERIOD, WEEKLY_ORDER)?);
    }

    Ok(Design { t, trend, seasonal })
}

fn rms(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v * v, n + 1));
    if n == 0 {
        0.0
    } else {
        (sum / n as f64).sqrt()
    }
}

impl ForecastModel for TrendSeasonalModel {
    type Trained = TrainedTrendSeasonal;

    fn train(&self, data: &TimeSeries) -> Result<Self::Trained> {
        let n = data.len();
        if n < 2 {
            return Err(ForecastError::ModelFitFailure(format!(
                "need at least two observations, got {}",
                n
            )));
        }
        let (start, end) = match (data.first_date(), data.last_date()) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Err(ForecastError::ModelFitFailure(
                    "empty training series".to_string(),
                ))
            }
        };
        let y_scale = abs_max(data.values());
        if !(y_scale > 0.0 && y_scale.is_finite()) {
            return Err(ForecastError::ModelFitFailure(
                "series is all zeros or contains non-finite values".to_string(),
            ));
        }
        let y: Vec<f64> = data.values().iter().map(|v| v / y_scale).collect();

        let span_days = (end - start).num_days() as f64;
        let yearly = Self::resolve(self.yearly_seasonality, span_days, 2.0 * YEARLY_PERIOD);
        let weekly = Self::resolve(self.weekly_seasonality, span_days, 2.0 * WEEKLY_PERIOD);

        let knot_idx = changepoint_indices(n, self.n_changepoints, self.changepoint_range)?;
        let t_all: Vec<f64> = data
            .dates()
            .iter()
            .map(|d| (*d - start).num_days() as f64 / span_days)
            .collect();
        let knots: Vec<f64> = knot_idx.iter().map(|&i| t_all[i]).collect();

        let design = build_design(data.dates(), start, span_days, &knots, yearly, weekly)?;
        let fit_err = |e: forecast_math::MathError| ForecastError::ModelFitFailure(e.to_string());

        let (trend_coefficients, seasonal_coefficients, fitted) = match self.seasonality_mode {
            SeasonalityMode::Additive => {
                let mut columns = design.trend.clone();
                columns.extend(design.seasonal.iter().cloned());
                let mut sigma = 0.1;
                let mut coefficients = Vec::new();
                let mut fitted = Vec::new();
                for _ in 0..2 {
                    let mut penalties = self.trend_penalties(knots.len(), sigma);
                    penalties.extend(self.seasonal_penalties(design.seasonal.len(), sigma));
                    let fit = RidgeRegression::new(penalties)
                        .and_then(|r| r.fit(&columns, &y))
                        .map_err(fit_err)?;
                    sigma = fit.residual_std.max(SIGMA_FLOOR);
                    coefficients = fit.coefficients;
                    fitted = fit.fitted;
                }
                let split = design.trend.len();
                let seasonal = coefficients.split_off(split);
                (coefficients, seasonal, fitted)
            }
            SeasonalityMode::Multiplicative => {
                let mut seasonal = vec![0.0_f64; n];
                let mut trend = vec![0.0_f64; n];
                let mut trend_coefficients = Vec::new();
                let mut seasonal_coefficients = Vec::new();
                let mut sigma = 0.1;
                let mut ratio_sigma = 0.1;
                for pass in 0..MULTIPLICATIVE_PASSES {
                    let deseasonalised: Vec<f64> = y
                        .iter()
                        .zip(seasonal.iter())
                        .map(|(v, s)| v / (1.0 + s).max(0.05))
                        .collect();
                    let trend_fit = RidgeRegression::new(self.trend_penalties(knots.len(), sigma))
                        .and_then(|r| r.fit(&design.trend, &deseasonalised))
                        .map_err(fit_err)?;
                    trend = trend_fit.fitted;
                    trend_coefficients = trend_fit.coefficients;

                    if design.seasonal.is_empty() {
                        break;
                    }
                    let ratio: Vec<f64> = y
                        .iter()
                        .zip(trend.iter())
                        .map(|(v, g)| v / g.abs().max(SIGMA_FLOOR) - 1.0)
                        .collect();
                    let seasonal_fit = RidgeRegression::new(
                        self.seasonal_penalties(design.seasonal.len(), ratio_sigma),
                    )
                    .and_then(|r| r.fit(&design.seasonal, &ratio))
                    .map_err(fit_err)?;
                    seasonal = seasonal_fit.fitted;
                    seasonal_coefficients = seasonal_fit.coefficients;
                    ratio_sigma = seasonal_fit.residual_std.max(SIGMA_FLOOR);

                    sigma = rms(
                        y.iter()
                            .zip(trend.iter().zip(seasonal.iter()))
                            .map(|(v, (g, s))| v - g * (1.0 + s)),
                    )
                    .max(SIGMA_FLOOR);
                    debug!(pass, sigma, "multiplicative pass");
                }
                let fitted: Vec<f64> = trend
                    .iter()
                    .zip(seasonal.iter())
                    .map(|(g, s)| g * (1.0 + s))
                    .collect();
                (trend_coefficients, seasonal_coefficients, fitted)
            }
        };

        let sigma = rms(y.iter().zip(fitted.iter()).map(|(a, f)| a - f));
        if !sigma.is_finite() {
            return Err(ForecastError::ModelFitFailure(
                "fit produced non-finite residuals".to_string(),
            ));
        }
        let deltas = &trend_coefficients[2..];
        let delta_scale = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64
        };

        debug!(
            model = %self.name,
            rows = n,
            changepoints = knots.len(),
            yearly,
            weekly,
            sigma,
            "model fitted"
        );

        Ok(TrainedTrendSeasonal {
            name: self.name.clone(),
            mode: self.seasonality_mode,
            interval_z: interval_z(self.interval_width)?,
            history: data.dates().to_vec(),
            start,
            end,
            span_days,
            y_scale,
            knots,
            trend_coefficients,
            yearly,
            weekly,
            seasonal_coefficients,
            sigma,
            delta_scale: delta_scale.max(1e-8),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedTrendSeasonal {
    /// Standard deviation of the trend `dt` scaled time units past the history
    ///
    /// Future changepoints arrive at the historical rate (one per knot per
    /// unit of scaled time) with Laplace-distributed slope changes, so the
    /// trend variance grows with the cube of the distance.
    fn trend_std(&self, dt: f64) -> f64 {
        if dt <= 0.0 || self.knots.is_empty() {
            return 0.0;
        }
        let rate = self.knots.len() as f64;
        (rate * 2.0 * self.delta_scale.powi(2) * dt.powi(3) / 3.0).sqrt()
    }
}

impl TrainedForecastModel for TrainedTrendSeasonal {
    fn make_future_dates(&self, periods: usize) -> Vec<NaiveDate> {
        self.history
            .iter()
            .copied()
            .chain(
                (1..=periods as i64)
                    .map_while(|k| self.end.checked_add_signed(Duration::days(k))),
            )
            .collect()
    }

    fn predict(&self, dates: &[NaiveDate]) -> Result<ForecastResult> {
        let design = build_design(
            dates,
            self.start,
            self.span_days,
            &self.knots,
            self.yearly,
            self.weekly,
        )?;

        let mut points = Vec::with_capacity(dates.len());
        for (i, date) in dates.iter().enumerate() {
            let trend = predict_row(&design.trend, &self.trend_coefficients, i);
            let seasonal = if design.seasonal.is_empty() {
                0.0
            } else {
                predict_row(&design.seasonal, &self.seasonal_coefficients, i)
            };

            let dt = design.t[i] - 1.0;
            let (yhat, trend_sd) = match self.mode {
                SeasonalityMode::Additive => (trend + seasonal, self.trend_std(dt)),
                SeasonalityMode::Multiplicative => (
                    trend * (1.0 + seasonal),
                    self.trend_std(dt) * (1.0 + seasonal).abs(),
                ),
            };
            let sd = (self.sigma.powi(2) + trend_sd.powi(2)).sqrt();
            let half_width = self.interval_z * sd * self.y_scale;
            let yhat = yhat * self.y_scale;

            points.push(ForecastPoint {
                date: *date,
                yhat,
                yhat_lower: yhat - half_width,
                yhat_upper: yhat + half_width,
            });
        }

        let history_len = dates.iter().filter(|d| **d <= self.end).count();
        ForecastResult::new(points, history_len)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear_series(days: usize) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let values = (0..days).map(|i| 100.0 + 0.5 * i as f64).collect();
        TimeSeries::daily(start, values).unwrap()
    }

    #[test]
    fn test_fits_linear_trend() {
        let series = linear_series(120);
        let params = ParameterSet::new(0.05, 10.0).unwrap();
        let model = TrendSeasonalModel::new(&params)
            .unwrap()
            .with_weekly_seasonality(SeasonalityToggle::Disabled);
        let trained = model.train(&series).unwrap();

        let dates = trained.make_future_dates(10);
        assert_eq!(dates.len(), 130);
        let forecast = trained.predict(&dates).unwrap();
        assert_eq!(forecast.history_len(), 120);

        let last = forecast.points().last().unwrap();
        assert_relative_eq!(last.yhat, 100.0 + 0.5 * 129.0, max_relative = 0.01);
    }

    #[test]
    fn test_interval_widens_with_horizon() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let values = (0..200)
            .map(|i| 100.0 + 0.5 * i as f64 + 3.0 * (i as f64 / 9.0).sin())
            .collect();
        let series = TimeSeries::daily(start, values).unwrap();
        let params = ParameterSet::new(0.5, 10.0).unwrap();
        let trained = TrendSeasonalModel::new(&params)
            .unwrap()
            .train(&series)
            .unwrap();
        let forecast = trained.predict(&trained.make_future_dates(30)).unwrap();

        let future = forecast.future();
        let first = future[0].yhat_upper - future[0].yhat_lower;
        let last = future[29].yhat_upper - future[29].yhat_lower;
        assert!(last >= first);
    }

    #[test]
    fn test_multiplicative_bounds_are_ordered() {
        let series = linear_series(200);
        let params = ParameterSet::new(0.5, 10.0).unwrap();
        let trained = TrendSeasonalModel::new(&params)
            .unwrap()
            .with_seasonality_mode(SeasonalityMode::Multiplicative)
            .with_interval_width(0.99)
            .unwrap()
            .train(&series)
            .unwrap();
        let forecast = trained.predict(&trained.make_future_dates(30)).unwrap();

        assert_eq!(forecast.len(), 230);
        for p in forecast.points() {
            assert!(p.yhat_lower <= p.yhat && p.yhat <= p.yhat_upper);
        }
    }

    #[test]
    fn test_rejects_degenerate_series() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let params = ParameterSet::new(0.05, 10.0).unwrap();
        let model = TrendSeasonalModel::new(&params).unwrap();

        let single = TimeSeries::daily(start, vec![1.0]).unwrap();
        assert!(matches!(
            model.train(&single),
            Err(ForecastError::ModelFitFailure(_))
        ));

        let zeros = TimeSeries::daily(start, vec![0.0; 30]).unwrap();
        assert!(matches!(
            model.train(&zeros),
            Err(ForecastError::ModelFitFailure(_))
        ));
    }

    fn last_knot(params: &ParameterSet, series: &TimeSeries) -> f64 {
        let trained = TrendSeasonalModel::new(params).unwrap().train(series).unwrap();
        trained.knots.iter().copied().fold(0.0, f64::max)
    }

    #[test]
    fn test_changepoints_stay_inside_range() {
        let series = linear_series(200);
        let default = ParameterSet::new(0.1, 1.0).unwrap();
        let halved = default.with_changepoint_range(0.5).unwrap();

        let default_last = last_knot(&default, &series);
        assert!(default_last > 0.75 && default_last <= 0.8, "{}", default_last);
        let halved_last = last_knot(&halved, &series);
        assert!(halved_last > 0.45 && halved_last <= 0.5, "{}", halved_last);
    }

    #[test]
    fn test_stored_changepoint_range_reaches_dashboard_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::store::ParameterStore::open(dir.path()).unwrap();
        let params = ParameterSet::new(0.1, 1.0)
            .unwrap()
            .with_changepoint_range(0.5)
            .unwrap();
        store.write_parameters(&params).unwrap();

        let stored = store.read_parameters().unwrap();
        let model = crate::service::dashboard_model(&stored, 0.95).unwrap();
        assert_eq!(model.changepoint_range, 0.5);
        let trained = model.train(&linear_series(400)).unwrap();
        assert!(!trained.knots.is_empty());
        assert!(trained.knots.iter().all(|&k| k <= 0.5));
    }

    #[test]
    fn test_interval_width_validated() {
        let params = ParameterSet::new(0.05, 10.0).unwrap();
        let model = TrendSeasonalModel::new(&params).unwrap();
        assert!(model.clone().with_interval_width(0.95).is_ok());
        assert!(model.with_interval_width(1.5).is_err());
    }
}
