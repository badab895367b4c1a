//! # Price Forecast
//!
//! Daily close-price forecasting with periodically tuned hyperparameters.
//!
//! ## Features
//!
//! - Daily history from Yahoo Finance, a CSV export or a synthetic generator,
//!   forward-filled onto a gap-free calendar
//! - A decomposable trend + seasonality model with changepoints, fitted as a
//!   ridge regression, with prediction intervals
//! - Rolling-origin cross-validation and per-horizon error metrics
//! - Grid search over the two prior scales, optionally on a thread pool
//! - An atomic JSON store for the tuned parameters and the accuracy outlook
//! - A forecast service that rebuilds the model for each dashboard request
//!
//! ## Quick Start
//!
//! ```no_run
//! use price_forecast::config::{DashboardVariant, PipelineConfig};
//! use price_forecast::data::DataLoader;
//! use price_forecast::pipeline::run_batch;
//! use price_forecast::service::{ForecastRequest, ForecastService};
//! use price_forecast::sources::YahooSource;
//! use price_forecast::store::ParameterStore;
//!
//! fn main() -> price_forecast::Result<()> {
//!     let config = PipelineConfig::default();
//!     let store = ParameterStore::open("store")?;
//!
//!     // Batch job: tune and persist
//!     let loader = DataLoader::from_config(Box::new(YahooSource::new()), &config);
//!     run_batch(&config, &loader, &store)?;
//!
//!     // Dashboard: forecast two weeks at 95%
//!     let loader = DataLoader::from_config(Box::new(YahooSource::new()), &config);
//!     let service = ForecastService::new(store.reader(), loader);
//!     let request = ForecastRequest::new(14, 0.95, DashboardVariant::Weekly)?;
//!     let view = service.forecast(&request)?;
//!     println!("{}", view.outlook);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod outlook;
pub mod pipeline;
pub mod service;
pub mod sources;
pub mod store;
pub mod tuning;

// Re-export commonly used types
pub use crate::config::{DashboardVariant, PipelineConfig};
pub use crate::data::{DataLoader, TimeSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{ForecastModel, ForecastResult, ParameterSet};
pub use crate::outlook::OutlookTable;
pub use crate::store::{ParameterStore, StoreReader};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
