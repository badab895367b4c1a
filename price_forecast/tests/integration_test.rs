use chrono::NaiveDate;
use price_forecast::config::{DashboardVariant, ParamGrid, PipelineConfig};
use price_forecast::data::{forward_fill, DataLoader, TimeSeries};
use price_forecast::pipeline::run_batch_on;
use price_forecast::service::{ForecastRequest, ForecastService};
use price_forecast::sources::SyntheticSource;
use price_forecast::store::ParameterStore;
use price_forecast::ForecastError;
use pretty_assertions::assert_eq;
use tempfile::{tempdir, NamedTempFile};

fn history() -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();
    let bars = SyntheticSource::new(99).with_gaps(9).generate(start, end).unwrap();
    forward_fill(&bars, start, end).unwrap()
}

fn small_grid_config() -> PipelineConfig {
    PipelineConfig {
        param_grid: ParamGrid {
            changepoint_prior_scale: vec![0.01, 0.5],
            seasonality_prior_scale: vec![0.1, 10.0],
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_batch_then_dashboard() {
    let dir = tempdir().unwrap();
    let store = ParameterStore::open(dir.path()).unwrap();
    let series = history();
    let config = small_grid_config();

    // 1. Tune and persist
    let outcome = run_batch_on(&config, &series, &store).unwrap();
    assert_eq!(outcome.history_len, series.len());
    assert_eq!(outcome.report.evaluations.len(), 4);
    assert_eq!(outcome.outlook.len(), 9);

    // 2. Both slots hold what the run produced
    assert_eq!(store.read_parameters().unwrap(), outcome.report.best_parameters());
    assert_eq!(store.read_outlook().unwrap(), outcome.outlook);

    // 3. A dashboard request uses the persisted state
    let loader = DataLoader::from_config(Box::new(SyntheticSource::new(99)), &config);
    let service = ForecastService::new(store.reader(), loader);
    let request = ForecastRequest::new(14, 0.9, DashboardVariant::Weekly).unwrap();
    let view = service.forecast_on(&series, &request).unwrap();

    assert_eq!(view.parameters, outcome.report.best_parameters());
    assert_eq!(view.outlook, outcome.outlook);
    assert_eq!(view.forecast.len(), series.len() + 14);
}

#[test]
fn test_failed_run_leaves_store_untouched() {
    let dir = tempdir().unwrap();
    let store = ParameterStore::open(dir.path()).unwrap();
    let series = history();

    // cutoffs after the end of the history cannot be evaluated
    let config = PipelineConfig {
        cutoffs: vec![NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()],
        ..small_grid_config()
    };
    assert!(run_batch_on(&config, &series, &store).is_err());
    assert!(store.read_parameters().is_err());
    assert!(store.read_outlook().is_err());
}

#[test]
fn test_oversized_horizon_is_a_config_error() {
    let dir = tempdir().unwrap();
    let store = ParameterStore::open(dir.path()).unwrap();
    let config: PipelineConfig =
        serde_json::from_str(r#"{"cv_horizon_days": 1000000000000}"#).unwrap();

    let result = run_batch_on(&config, &history(), &store);
    assert!(matches!(result, Err(ForecastError::Config(_))));
    assert!(store.read_parameters().is_err());
}

#[test]
fn test_forecast_export_to_csv() {
    let dir = tempdir().unwrap();
    let store = ParameterStore::open(dir.path()).unwrap();
    run_batch_on(&small_grid_config(), &history(), &store).unwrap();

    let loader = DataLoader::from_config(Box::new(SyntheticSource::new(99)), &small_grid_config());
    let service = ForecastService::new(store.reader(), loader);
    let request = ForecastRequest::for_variant(DashboardVariant::Weekly);
    let view = service.forecast_on(&history(), &request).unwrap();

    let out = NamedTempFile::new().unwrap();
    view.forecast.write_csv(out.path()).unwrap();

    let text = std::fs::read_to_string(out.path()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("ds,yhat,yhat_lower,yhat_upper"));
    assert_eq!(lines.count(), view.forecast.len());
}
