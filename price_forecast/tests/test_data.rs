use chrono::NaiveDate;
use price_forecast::config::PipelineConfig;
use price_forecast::data::{forward_fill, DataLoader, TimeSeries};
use price_forecast::sources::{CsvSource, DailyBar, PriceSource, SyntheticSource};
use price_forecast::ForecastError;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn yahoo_export() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Open,High,Low,Close,Adj Close,Volume").unwrap();
    writeln!(file, "2023-01-01,1196.7,1203.5,1192.9,1200.9,1200.9,2399674550").unwrap();
    writeln!(file, "2023-01-02,1200.9,1219.8,1195.2,1214.7,1214.7,3765758498").unwrap();
    writeln!(file, "2023-01-03,null,null,null,null,null,null").unwrap();
    writeln!(file, "2023-01-05,1250.0,1262.1,1240.3,1251.4,1251.4,4100000000").unwrap();
    writeln!(file, "2023-01-06,1251.4,1270.0,1248.0,1268.2,1268.2,3900000000").unwrap();
    file
}

#[test]
fn test_csv_source_reads_yahoo_export() {
    let file = yahoo_export();
    let source = CsvSource::new(file.path());
    let bars = source
        .fetch("ETH-USD", date(2023, 1, 1), date(2023, 1, 31))
        .unwrap();

    // the null row is skipped
    assert_eq!(bars.len(), 4);
    assert_eq!(bars[1].close, 1214.7);
    assert_eq!(bars[2].date, date(2023, 1, 5));
}

#[test]
fn test_loader_fills_every_day() {
    let file = yahoo_export();
    let loader = DataLoader::new(Box::new(CsvSource::new(file.path())), "ETH-USD", date(2023, 1, 1));

    // history ends the day before "today"
    let series = loader.load_as_of(date(2023, 1, 8)).unwrap();

    assert_eq!(series.first_date(), Some(date(2023, 1, 1)));
    assert_eq!(series.last_date(), Some(date(2023, 1, 7)));
    assert!(series.is_contiguous());
    assert_eq!(
        series.values(),
        &[1200.9, 1214.7, 1214.7, 1214.7, 1251.4, 1268.2, 1268.2]
    );
}

#[test]
fn test_loader_with_synthetic_gaps() {
    let config = PipelineConfig {
        start_date: date(2020, 1, 1),
        ..PipelineConfig::default()
    };
    let source = SyntheticSource::new(3).with_gaps(4);
    let loader = DataLoader::from_config(Box::new(source), &config);
    let series = loader.load_as_of(date(2020, 3, 1)).unwrap();

    assert_eq!(loader.symbol(), "ETH-USD");
    assert_eq!(series.len(), 60);
    assert!(series.is_contiguous());
    // each dropped day repeats the day before it
    assert_eq!(series.values()[3], series.values()[2]);
    assert_eq!(series.values()[7], series.values()[6]);
}

#[test]
fn test_loader_reports_unavailable_data() {
    let file = yahoo_export();
    let loader = DataLoader::new(Box::new(CsvSource::new(file.path())), "ETH-USD", date(2024, 1, 1));
    let result = loader.load_as_of(date(2024, 2, 1));
    assert!(matches!(result, Err(ForecastError::DataUnavailable(_))));

    let missing = DataLoader::new(
        Box::new(CsvSource::new("does_not_exist.csv")),
        "ETH-USD",
        date(2023, 1, 1),
    );
    assert!(matches!(
        missing.load_as_of(date(2023, 2, 1)),
        Err(ForecastError::DataUnavailable(_))
    ));
}

#[test]
fn test_forward_fill_never_looks_ahead() {
    let bars: Vec<DailyBar> = [(2, 5.0), (6, 9.0)]
        .iter()
        .map(|&(d, close)| DailyBar {
            date: date(2022, 6, d),
            open: close,
            high: close,
            low: close,
            close,
        })
        .collect();
    let series = forward_fill(&bars, date(2022, 6, 1), date(2022, 6, 7)).unwrap();

    assert_eq!(series.first_date(), Some(date(2022, 6, 2)));
    assert_eq!(series.values(), &[5.0, 5.0, 5.0, 5.0, 9.0, 9.0]);
}

#[test]
fn test_time_series_frame() {
    let series = TimeSeries::daily(date(2023, 1, 1), vec![100.0, 103.0, 106.0]).unwrap();
    let df = series.to_dataframe().unwrap();

    assert_eq!(df.height(), 3);
    assert_eq!(df.get_column_names(), vec!["ds", "y"]);
    assert_eq!(series.slice_until(date(2023, 1, 2)).len(), 2);
}
