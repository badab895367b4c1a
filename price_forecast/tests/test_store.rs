use price_forecast::models::ParameterSet;
use price_forecast::outlook::{OutlookRow, OutlookTable};
use price_forecast::store::{ParameterStore, StoreReader};
use price_forecast::ForecastError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::tempdir;

fn sample_outlook() -> OutlookTable {
    OutlookTable {
        rows: (6..=14)
            .map(|h| OutlookRow {
                horizon: format!("{} days", h),
                dollar_error: 101.37 + h as f64,
                accuracy_percent: 95.12 - h as f64 * 0.1,
            })
            .collect(),
    }
}

#[rstest]
#[case(ParameterSet::new(0.001, 0.01).unwrap())]
#[case(ParameterSet::new(0.1, 10.0).unwrap())]
#[case(ParameterSet::new(0.5, 1.0).unwrap().with_changepoint_range(0.9).unwrap())]
fn test_parameters_round_trip(#[case] params: ParameterSet) {
    let dir = tempdir().unwrap();
    let store = ParameterStore::open(dir.path()).unwrap();

    store.write_parameters(&params).unwrap();
    assert_eq!(store.read_parameters().unwrap(), params);
}

#[test]
fn test_outlook_round_trip() {
    let dir = tempdir().unwrap();
    let store = ParameterStore::open(dir.path().join("nested").join("store")).unwrap();

    let outlook = sample_outlook();
    store.write_outlook(&outlook).unwrap();
    assert_eq!(store.read_outlook().unwrap(), outlook);
}

#[test]
fn test_missing_slots_are_reported() {
    let dir = tempdir().unwrap();
    let reader = StoreReader::new(dir.path().join("never_written"));

    match reader.read_parameters() {
        Err(ForecastError::MissingPersistedState(slot)) => assert_eq!(slot, "tuned_params"),
        other => panic!("expected missing state, got {:?}", other),
    }
    match reader.read_outlook() {
        Err(ForecastError::MissingPersistedState(slot)) => assert_eq!(slot, "outlook"),
        other => panic!("expected missing state, got {:?}", other),
    }
}

#[test]
fn test_latest_write_wins() {
    let dir = tempdir().unwrap();
    let store = ParameterStore::open(dir.path()).unwrap();
    let reader = store.reader();

    store.write_parameters(&ParameterSet::new(0.01, 0.1).unwrap()).unwrap();
    let newer = ParameterSet::new(0.5, 10.0).unwrap();
    store.write_parameters(&newer).unwrap();

    assert_eq!(reader.read_parameters().unwrap(), newer);
    // outlook slot is independent
    assert!(reader.read_outlook().is_err());
}

#[test]
fn test_legacy_blob_without_changepoint_range() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("tuned_params.json"),
        r#"{"changepoint_prior_scale": 0.1, "seasonality_prior_scale": 10.0}"#,
    )
    .unwrap();

    let params = StoreReader::new(dir.path()).read_parameters().unwrap();
    assert_eq!(params.changepoint_range, None);
    assert_eq!(params.seasonality_prior_scale, 10.0);
}

#[test]
fn test_invalid_stored_parameters_are_rejected() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("tuned_params.json"),
        r#"{"changepoint_prior_scale": -1.0, "seasonality_prior_scale": 10.0}"#,
    )
    .unwrap();

    assert!(matches!(
        StoreReader::new(dir.path()).read_parameters(),
        Err(ForecastError::Serialization(_))
    ));
}
