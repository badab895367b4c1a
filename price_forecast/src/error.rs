//! Error types for the price_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the price_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Upstream price history could not be fetched or contained nothing usable
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A store slot was read before any tuning run wrote it
    #[error("Missing persisted state: no '{0}' has been written yet, run the tuning job first")]
    MissingPersistedState(String),

    /// The forecasting model rejected its input
    #[error("Model fit failure: {0}")]
    ModelFitFailure(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error in pipeline or dashboard configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error encoding or decoding a persisted blob
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] forecast_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}
