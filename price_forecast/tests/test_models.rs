use chrono::{Duration, NaiveDate};
use price_forecast::data::{forward_fill, TimeSeries};
use price_forecast::models::{
    ForecastModel, ParameterSet, SeasonalityMode, SeasonalityToggle, TrainedForecastModel,
    TrendSeasonalModel,
};
use price_forecast::sources::SyntheticSource;
use rstest::rstest;

fn synthetic_history(days: i64) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let end = start + Duration::days(days - 1);
    let bars = SyntheticSource::new(11).generate(start, end).unwrap();
    forward_fill(&bars, start, end).unwrap()
}

#[rstest]
#[case(SeasonalityMode::Additive, 0.80)]
#[case(SeasonalityMode::Multiplicative, 0.95)]
#[case(SeasonalityMode::Multiplicative, 0.99)]
fn test_forecast_covers_history_and_horizon(#[case] mode: SeasonalityMode, #[case] width: f64) {
    let data = synthetic_history(800);
    let params = ParameterSet::new(0.05, 10.0).unwrap();
    let model = TrendSeasonalModel::new(&params)
        .unwrap()
        .with_seasonality_mode(mode)
        .with_yearly_seasonality(SeasonalityToggle::Enabled)
        .with_interval_width(width)
        .unwrap();

    let trained = model.train(&data).unwrap();
    let dates = trained.make_future_dates(30);
    let forecast = trained.predict(&dates).unwrap();

    assert_eq!(forecast.len(), data.len() + 30);
    assert_eq!(forecast.history_len(), data.len());
    assert_eq!(forecast.horizon(), 30);
    for point in forecast.points() {
        assert!(point.yhat_lower <= point.yhat, "{:?}", point);
        assert!(point.yhat <= point.yhat_upper, "{:?}", point);
        assert!(point.yhat.is_finite());
    }
}

#[test]
fn test_future_dates_are_consecutive() {
    let data = synthetic_history(120);
    let params = ParameterSet::new(0.1, 1.0).unwrap();
    let trained = TrendSeasonalModel::new(&params).unwrap().train(&data).unwrap();

    let dates = trained.make_future_dates(10);
    let last = data.last_date().unwrap();
    let future = &dates[data.len()..];

    assert_eq!(&dates[..data.len()], data.dates());
    assert_eq!(future.len(), 10);
    for (k, d) in future.iter().enumerate() {
        assert_eq!(*d, last + Duration::days(k as i64 + 1));
    }
}

#[test]
fn test_in_sample_fit_tracks_history() {
    let data = synthetic_history(730);
    let params = ParameterSet::new(0.5, 10.0).unwrap();
    let model = TrendSeasonalModel::new(&params)
        .unwrap()
        .with_seasonality_mode(SeasonalityMode::Multiplicative);
    let trained = model.train(&data).unwrap();
    let forecast = trained.predict(data.dates()).unwrap();

    let mae = forecast.mean_absolute_error(data.values()).unwrap();
    let mean_price = data.values().iter().sum::<f64>() / data.len() as f64;
    assert!(mae < 0.25 * mean_price, "mae {} vs mean {}", mae, mean_price);
}

/// Flat for 150 days, then rising two dollars a day
fn late_breakout() -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let values = (0..200)
        .map(|i| if i < 150 { 100.0 } else { 100.0 + 2.0 * (i - 150) as f64 })
        .collect();
    TimeSeries::daily(start, values).unwrap()
}

fn in_sample_mae(range: f64, data: &TimeSeries) -> f64 {
    let params = ParameterSet::new(0.5, 1.0)
        .unwrap()
        .with_changepoint_range(range)
        .unwrap();
    let trained = TrendSeasonalModel::new(&params)
        .unwrap()
        .with_yearly_seasonality(SeasonalityToggle::Disabled)
        .with_weekly_seasonality(SeasonalityToggle::Disabled)
        .train(data)
        .unwrap();
    trained
        .predict(data.dates())
        .unwrap()
        .mean_absolute_error(data.values())
        .unwrap()
}

#[test]
fn test_changepoint_range_limits_trend_bends() {
    let data = late_breakout();
    // with changepoints confined to the first half the trend cannot bend at day 150
    let confined = in_sample_mae(0.5, &data);
    let wide = in_sample_mae(0.9, &data);
    assert!(confined > 2.0 * wide, "confined {} vs wide {}", confined, wide);
}

#[rstest]
#[case(0.0)]
#[case(1.5)]
#[case(f64::NAN)]
fn test_changepoint_range_bounds(#[case] range: f64) {
    let params = ParameterSet::new(0.1, 1.0).unwrap();
    assert!(params.with_changepoint_range(range).is_err());
}
