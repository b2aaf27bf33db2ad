//! Closed-form ridge regression
//!
//! Solves `(XᵗX + λI)θ = Xᵗy` on the design matrix augmented with a ones
//! column. The penalty covers every coefficient, bias included, so existing
//! artifacts stay bit-reproducible. The system is symmetric positive definite
//! for `λ > 0` and is solved through a `faer` Cholesky factorization.

use crate::error::FitError;
use crate::schema::{Sample, NUM_FEATURES};
use faer::prelude::*;
use faer::{Mat, Side};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Default ridge penalty
pub const DEFAULT_LAMBDA: f64 = 1e-3;

/// Squared Cholesky pivots below this fraction of their diagonal entry mark a
/// rank-deficient system
const RANK_TOLERANCE: f64 = 1e-10;

/// Fitted coefficients in feature order plus the intercept
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub weights: [f64; NUM_FEATURES],
    pub bias: f64,
}

impl LinearFit {
    /// Unclamped linear response
    pub fn predict(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        self.weights
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias
    }
}

/// Fit on already-normalized samples
pub fn fit_samples(samples: &[Sample], lambda: f64) -> Result<LinearFit, FitError> {
    let (x, y) = design_matrix(samples);
    let theta = fit(x.view(), y.view(), lambda)?;

    let mut weights = [0.0; NUM_FEATURES];
    for (w, t) in weights.iter_mut().zip(theta.iter()) {
        *w = *t;
    }
    Ok(LinearFit {
        weights,
        bias: theta[NUM_FEATURES],
    })
}

/// Solve the ridge system, returning `[w_0 .. w_{d-1}, bias]`
pub fn fit(x: ArrayView2<f64>, y: ArrayView1<f64>, lambda: f64) -> Result<Array1<f64>, FitError> {
    let (rows, cols) = x.dim();
    if rows != y.len() {
        return Err(FitError::DimensionMismatch {
            rows,
            targets: y.len(),
        });
    }
    if rows == 0 {
        return Err(FitError::NoSamples);
    }

    let mut augmented = Array2::<f64>::ones((rows, cols + 1));
    augmented.slice_mut(s![.., ..cols]).assign(&x);

    let mut gram = augmented.t().dot(&augmented);
    gram.diag_mut().mapv_inplace(|v| v + lambda);
    let rhs = augmented.t().dot(&y);

    let theta = solve(gram, rhs)?;
    if theta.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }
    Ok(theta)
}

/// Cholesky solve of the symmetric positive definite ridge system
fn solve(a: Array2<f64>, b: Array1<f64>) -> Result<Array1<f64>, FitError> {
    let n = b.len();
    let lhs = Mat::<f64>::from_fn(n, n, |i, j| a[[i, j]]);
    let rhs = Mat::<f64>::from_fn(n, 1, |i, _| b[i]);

    let chol = lhs
        .cholesky(Side::Lower)
        .map_err(|_| FitError::Singular { column: n, dim: n })?;

    // Exactly collinear columns can factor with a rounding-sized pivot
    let l = chol.compute_l();
    for i in 0..n {
        let pivot = l.read(i, i);
        if !pivot.is_finite() || pivot * pivot <= RANK_TOLERANCE * a[[i, i]].abs() {
            return Err(FitError::Singular { column: i, dim: n });
        }
    }

    let theta = chol.solve(&rhs);
    Ok((0..n).map(|i| theta.read(i, 0)).collect())
}

/// Stack samples into `(X, y)`
pub fn design_matrix(samples: &[Sample]) -> (Array2<f64>, Array1<f64>) {
    let mut x = Array2::<f64>::zeros((samples.len(), NUM_FEATURES));
    for (mut row, sample) in x.axis_iter_mut(Axis(0)).zip(samples.iter()) {
        row.assign(&ArrayView1::from(&sample.features[..]));
    }
    let y = samples.iter().map(|s| s.label).collect::<Array1<f64>>();
    (x, y)
}
