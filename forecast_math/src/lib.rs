//! # Forecast Math
//!
//! Numeric building blocks for the price forecasting model.
//! This crate provides the penalised least-squares solver used to fit the
//! model, the trend and seasonal basis functions it regresses on, and the
//! small statistics helpers used to turn residuals into intervals.

use thiserror::Error;

pub mod basis;
pub mod regression;
pub mod stats;

pub use regression::{RidgeFit, RidgeRegression};

/// Errors that can occur in forecasting math
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;
