//! Basis functions for trend and seasonal regressors
//!
//! The forecasting model is linear in these features:
//! - hinge functions `max(0, t - s_j)` give a continuous piecewise-linear trend
//! - Fourier pairs `sin/cos(2 pi n t / P)` give a smooth periodic component

use crate::{MathError, Result};
use std::f64::consts::PI;

/// Hinge columns `max(0, t - knot)` for each knot
pub fn hinge_features(t: &[f64], knots: &[f64]) -> Vec<Vec<f64>> {
    knots
        .iter()
        .map(|&knot| t.iter().map(|&x| (x - knot).max(0.0)).collect())
        .collect()
}

/// Fourier columns for a period of `period` time units
///
/// Returns `2 * order` columns ordered `sin(1), cos(1), sin(2), cos(2), ...`.
pub fn fourier_features(t: &[f64], period: f64, order: usize) -> Result<Vec<Vec<f64>>> {
    if period <= 0.0 || !period.is_finite() {
        return Err(MathError::InvalidInput(format!(
            "Seasonal period must be positive, got {}",
            period
        )));
    }

    let mut columns = Vec::with_capacity(2 * order);
    for n in 1..=order {
        let w = 2.0 * PI * n as f64 / period;
        columns.push(t.iter().map(|&x| (w * x).sin()).collect());
        columns.push(t.iter().map(|&x| (w * x).cos()).collect());
    }

    Ok(columns)
}

/// Evenly spaced knot indices over the first `range` fraction of `n` rows
///
/// The first row is never a knot; at most `count` knots are produced and
/// fewer when the history is too short to hold them.
pub fn changepoint_indices(n: usize, count: usize, range: f64) -> Result<Vec<usize>> {
    if !(range > 0.0 && range <= 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Changepoint range must be in (0, 1], got {}",
            range
        )));
    }

    let hist = ((n as f64) * range).floor() as usize;
    if hist < 2 || count == 0 {
        return Ok(Vec::new());
    }
    let count = count.min(hist - 1);

    let mut indices: Vec<usize> = (1..=count)
        .map(|k| ((k as f64) * (hist - 1) as f64 / count as f64).round() as usize)
        .collect();
    indices.dedup();

    Ok(indices)
}
