//! Penalised least squares
//!
//! Solves `min ||y - Xb||^2 + sum_j lambda_j * b_j^2` in closed form through
//! the normal equations `(X'X + diag(lambda)) b = X'y`. Each column carries its
//! own penalty so that a Gaussian prior `b_j ~ N(0, s_j^2)` maps to
//! `lambda_j = sigma^2 / s_j^2`.

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};

/// Ridge regression with a separate penalty per column
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    penalties: Vec<f64>,
}

/// Output of a ridge fit
#[derive(Debug, Clone)]
pub struct RidgeFit {
    /// Fitted coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// In-sample fitted values
    pub fitted: Vec<f64>,
    /// Root mean squared residual
    pub residual_std: f64,
}

impl RidgeRegression {
    /// Create a solver for a design with `penalties.len()` columns
    pub fn new(penalties: Vec<f64>) -> Result<Self> {
        if penalties.is_empty() {
            return Err(MathError::InvalidInput(
                "At least one column penalty is required".to_string(),
            ));
        }
        if let Some(bad) = penalties.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(MathError::InvalidInput(format!(
                "Penalties must be finite and non-negative, got {}",
                bad
            )));
        }

        Ok(Self { penalties })
    }

    /// Fit coefficients for the given column-major design
    ///
    /// `columns[j][i]` is the value of feature `j` at observation `i`.
    pub fn fit(&self, columns: &[Vec<f64>], target: &[f64]) -> Result<RidgeFit> {
        if columns.len() != self.penalties.len() {
            return Err(MathError::DimensionMismatch {
                expected: self.penalties.len(),
                got: columns.len(),
            });
        }
        let n = target.len();
        if n == 0 {
            return Err(MathError::InsufficientData(
                "Cannot fit a regression on an empty target".to_string(),
            ));
        }
        if let Some(col) = columns.iter().find(|c| c.len() != n) {
            return Err(MathError::DimensionMismatch {
                expected: n,
                got: col.len(),
            });
        }
        if target.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Target contains non-finite values".to_string(),
            ));
        }

        let design = DMatrix::from_fn(n, columns.len(), |i, j| columns[j][i]);
        let y = DVector::from_column_slice(target);
        let coefficients = self.solve(&design, &y)?;

        let fitted = &design * &coefficients;
        let sse: f64 = fitted
            .iter()
            .zip(target.iter())
            .map(|(f, a)| (a - f).powi(2))
            .sum();

        Ok(RidgeFit {
            coefficients: coefficients.iter().copied().collect(),
            fitted: fitted.iter().copied().collect(),
            residual_std: (sse / n as f64).sqrt(),
        })
    }

    /// Solve the penalised normal equations
    pub fn solve(&self, design: &DMatrix<f64>, target: &DVector<f64>) -> Result<DVector<f64>> {
        if design.ncols() != self.penalties.len() {
            return Err(MathError::DimensionMismatch {
                expected: self.penalties.len(),
                got: design.ncols(),
            });
        }

        let mut gram = design.tr_mul(design);
        for (j, penalty) in self.penalties.iter().enumerate() {
            gram[(j, j)] += penalty;
        }
        let rhs = design.tr_mul(target);

        let cholesky = gram.cholesky().ok_or_else(|| {
            MathError::CalculationError(
                "Normal equations are not positive definite".to_string(),
            )
        })?;
        let solution = cholesky.solve(&rhs);

        if solution.iter().any(|b| !b.is_finite()) {
            return Err(MathError::CalculationError(
                "Solution contains non-finite coefficients".to_string(),
            ));
        }

        Ok(solution)
    }
}

/// Evaluate a linear predictor for observation `i` of a column-major design
pub fn predict_row(columns: &[Vec<f64>], coefficients: &[f64], i: usize) -> f64 {
    columns
        .iter()
        .zip(coefficients.iter())
        .map(|(col, b)| col[i] * b)
        .sum()
}
