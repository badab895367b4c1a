//! Statistics helpers for intervals and reporting

use crate::{MathError, Result};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;

/// Two-sided standard normal multiplier for an interval of the given width
///
/// A width of 0.95 gives roughly 1.96.
pub fn interval_z(width: f64) -> Result<f64> {
    if !(width > 0.0 && width < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Interval width must be in (0, 1), got {}",
            width
        )));
    }

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| MathError::CalculationError(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Largest absolute value, used to scale series into a unit range
pub fn abs_max(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Trailing mean of `values` over groups ordered by key
///
/// Values are summed per group. Walking from the largest key down, each
/// output row averages the smallest trailing block of groups that holds at
/// least `window` values; when the block overshoots, the oldest group is
/// counted only partially, by its own mean. Keys that never collect enough
/// support are left out, so the output starts at the first key with a full
/// window.
pub fn rolling_mean_by_group(
    values: &[f64],
    groups: &[i64],
    window: usize,
) -> Result<(Vec<i64>, Vec<f64>)> {
    if values.len() != groups.len() {
        return Err(MathError::DimensionMismatch {
            expected: groups.len(),
            got: values.len(),
        });
    }
    if window == 0 {
        return Err(MathError::InvalidInput(
            "Rolling window must hold at least one value".to_string(),
        ));
    }

    let mut totals: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for (&key, &value) in groups.iter().zip(values) {
        let entry = totals.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    let keys: Vec<i64> = totals.keys().copied().collect();
    let sums: Vec<f64> = totals.values().map(|t| t.0).collect();
    let counts: Vec<usize> = totals.values().map(|t| t.1).collect();

    let mut out = vec![0.0; keys.len()];
    // groups at index < remaining have no output yet
    let mut remaining = keys.len();
    let mut x_sum = 0.0;
    let mut n_sum = 0usize;
    for i in (0..keys.len()).rev() {
        x_sum += sums[i];
        n_sum += counts[i];
        while n_sum >= window && remaining > 0 {
            let excess_n = (n_sum - window) as f64;
            let excess_x = excess_n * sums[i] / counts[i] as f64;
            let trailing = remaining - 1;
            out[trailing] = (x_sum - excess_x) / window as f64;
            x_sum -= sums[trailing];
            n_sum -= counts[trailing];
            remaining = trailing;
        }
    }

    Ok((keys[remaining..].to_vec(), out[remaining..].to_vec()))
}
