//! Request-time forecasting for the dashboard

use crate::config::{DashboardVariant, MAX_WINDOW_DAYS};
use crate::data::{DataLoader, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::{
    ForecastModel, ForecastResult, ParameterSet, SeasonalityMode, SeasonalityToggle,
    TrainedForecastModel, TrendSeasonalModel,
};
use crate::outlook::OutlookTable;
use crate::store::StoreReader;
use tracing::info;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub horizon: usize,
    pub interval_width: f64,
    pub variant: DashboardVariant,
}

impl ForecastRequest {
    /// Validate the horizon and that the variant offers `interval_width`
    pub fn new(horizon: usize, interval_width: f64, variant: DashboardVariant) -> Result<Self> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be at least one day".to_string(),
            ));
        }
        if horizon > MAX_WINDOW_DAYS as usize {
            return Err(ForecastError::InvalidParameter(format!(
                "Forecast horizon of {} days exceeds the {} day limit",
                horizon, MAX_WINDOW_DAYS
            )));
        }
        let interval_width = variant.check_interval(interval_width)?;
        Ok(Self {
            horizon,
            interval_width,
            variant,
        })
    }

    /// Defaults of the variant
    pub fn for_variant(variant: DashboardVariant) -> Self {
        Self {
            horizon: variant.default_horizon(),
            interval_width: variant.default_interval(),
            variant,
        }
    }
}

/// Everything the dashboard shows
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub symbol: String,
    pub request: ForecastRequest,
    pub parameters: ParameterSet,
    pub forecast: ForecastResult,
    pub outlook: OutlookTable,
}

/// Model rebuilt from persisted parameters for a dashboard request
pub fn dashboard_model(params: &ParameterSet, interval_width: f64) -> Result<TrendSeasonalModel> {
    TrendSeasonalModel::new(params)?
        .with_seasonality_mode(SeasonalityMode::Multiplicative)
        .with_yearly_seasonality(SeasonalityToggle::Enabled)
        .with_interval_width(interval_width)
}

/// Fit `params` on `series` and forecast `request.horizon` days past its end
pub fn forecast_series(
    series: &TimeSeries,
    params: &ParameterSet,
    request: &ForecastRequest,
) -> Result<ForecastResult> {
    let model = dashboard_model(params, request.interval_width)?;
    let trained = model.train(series)?;
    let dates = trained.make_future_dates(request.horizon);
    trained.predict(&dates)
}

/// Reads the store and fresh history, then forecasts
#[derive(Debug)]
pub struct ForecastService {
    store: StoreReader,
    loader: DataLoader,
}

impl ForecastService {
    pub fn new(store: StoreReader, loader: DataLoader) -> Self {
        Self { store, loader }
    }

    pub fn forecast(&self, request: &ForecastRequest) -> Result<DashboardView> {
        let series = self.loader.load()?;
        self.forecast_on(&series, request)
    }

    /// Same as [`ForecastService::forecast`] with an already loaded history
    pub fn forecast_on(&self, series: &TimeSeries, request: &ForecastRequest) -> Result<DashboardView> {
        let parameters = self.store.read_parameters()?;
        let outlook = self.store.read_outlook()?;

        let forecast = forecast_series(series, &parameters, request)?;
        info!(
            horizon = request.horizon,
            interval_width = request.interval_width,
            rows = forecast.len(),
            "forecast ready"
        );

        Ok(DashboardView {
            symbol: self.loader.symbol().to_string(),
            request: *request,
            parameters,
            forecast,
            outlook,
        })
    }
}
