//! The batch tuning job
//!
//! Load history, tune the prior scales, measure the outlook with the winners
//! and only then persist both slots. A failure at any step leaves the
//! store untouched.

use crate::config::PipelineConfig;
use crate::data::{DataLoader, TimeSeries};
use crate::error::Result;
use crate::outlook::{outlook_model, OutlookBuilder, OutlookTable};
use crate::store::ParameterStore;
use crate::tuning::{Tuner, TuningReport};
use tracing::info;

/// What one batch run produced
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub history_len: usize,
    pub report: TuningReport,
    pub outlook: OutlookTable,
}

/// Tune and measure without touching the store
pub fn evaluate(config: &PipelineConfig, series: &TimeSeries) -> Result<(TuningReport, OutlookTable)> {
    config.validate()?;
    let report = Tuner::new(config).tune(series)?;
    let params = report.best_parameters();

    let model = outlook_model(&params)?;
    let outlook = OutlookBuilder::new(config).build(&model, series)?;

    Ok((report, outlook))
}

/// Full tuning job: load, tune, measure, persist
pub fn run_batch(
    config: &PipelineConfig,
    loader: &DataLoader,
    store: &ParameterStore,
) -> Result<BatchOutcome> {
    config.validate()?;
    let series = loader.load()?;
    run_batch_on(config, &series, store)
}

/// [`run_batch`] over an already loaded history
pub fn run_batch_on(
    config: &PipelineConfig,
    series: &TimeSeries,
    store: &ParameterStore,
) -> Result<BatchOutcome> {
    info!(rows = series.len(), "starting tuning run");
    let (report, outlook) = evaluate(config, series)?;

    store.write_parameters(&report.best_parameters())?;
    store.write_outlook(&outlook)?;
    info!(outlook_rows = outlook.len(), "tuning run complete");

    Ok(BatchOutcome {
        history_len: series.len(),
        report,
        outlook,
    })
}
