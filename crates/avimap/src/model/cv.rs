//! K-fold cross-validation for penalty-strength selection.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::linear::check_target_variance;
use super::penalized::{descend, standardize};
use crate::error::{AvimapError, Result};

/// Floor on the effective L1 ratio when deriving the grid top, so a pure
/// ridge penalty still gets a finite lambda range.
const L1_RATIO_FLOOR: f64 = 1e-3;

/// Ratio between the smallest and largest lambda on the grid.
const LAMBDA_MIN_RATIO: f64 = 1e-3;

/// The evaluated lambda grid with held-out errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaPath {
    pub lambdas: Vec<f64>,
    pub mse: Vec<f64>,
    pub best_lambda: f64,
    pub best_mse: f64,
}

/// Choose the penalty weight minimizing held-out squared error over a
/// log-spaced grid descending from the data-derived lambda_max.
///
/// Fold assignment is deterministic (row index modulo k), keeping model
/// selection reproducible across runs.
pub fn select_lambda(
    x: &Array2<f64>,
    y: &Array1<f64>,
    l1_ratio: f64,
    k_folds: usize,
    n_lambdas: usize,
) -> Result<LambdaPath> {
    let n = x.nrows();
    if n < k_folds || k_folds < 2 {
        return Err(AvimapError::InsufficientData {
            rows: n,
            predictors: x.ncols(),
        });
    }
    check_target_variance(y)?;

    let (xs, ys, _) = standardize(x, y);

    // Smallest lambda that zeroes every coefficient under a pure L1 fit.
    let n_f = n as f64;
    let lambda_max = (0..xs.ncols())
        .map(|j| {
            xs.column(j)
                .iter()
                .zip(ys.iter())
                .map(|(xij, yi)| xij * yi)
                .sum::<f64>()
                .abs()
                / n_f
        })
        .fold(0.0, f64::max)
        / l1_ratio.max(L1_RATIO_FLOOR);
    let lambda_max = lambda_max.max(f64::EPSILON);

    let step = LAMBDA_MIN_RATIO.powf(1.0 / (n_lambdas.saturating_sub(1)).max(1) as f64);
    let lambdas: Vec<f64> = (0..n_lambdas)
        .map(|i| lambda_max * step.powi(i as i32))
        .collect();

    let mut mse = Vec::with_capacity(lambdas.len());
    for &lambda in &lambdas {
        mse.push(cv_mse(&xs, &ys, lambda, l1_ratio, k_folds));
    }

    // First (largest) lambda wins ties: prefer the stronger penalty.
    let mut best = 0;
    for (i, err) in mse.iter().enumerate() {
        if *err < mse[best] {
            best = i;
        }
    }

    Ok(LambdaPath {
        best_lambda: lambdas[best],
        best_mse: mse[best],
        lambdas,
        mse,
    })
}

/// Mean held-out squared error across folds at one penalty strength.
fn cv_mse(xs: &Array2<f64>, ys: &Array1<f64>, lambda: f64, l1_ratio: f64, k: usize) -> f64 {
    let n = xs.nrows();
    let p = xs.ncols();
    let mut total_se = 0.0;
    let mut total_held = 0usize;

    for fold in 0..k {
        let train: Vec<usize> = (0..n).filter(|i| i % k != fold).collect();
        let held: Vec<usize> = (0..n).filter(|i| i % k == fold).collect();
        if held.is_empty() || train.is_empty() {
            continue;
        }

        let mut x_train = Array2::zeros((train.len(), p));
        let mut y_train = Array1::zeros(train.len());
        for (row, &i) in train.iter().enumerate() {
            for j in 0..p {
                x_train[[row, j]] = xs[[i, j]];
            }
            y_train[row] = ys[i];
        }

        let beta = descend(&x_train, &y_train, lambda, l1_ratio);
        for &i in &held {
            let prediction: f64 = (0..p).map(|j| beta[j] * xs[[i, j]]).sum();
            total_se += (ys[i] - prediction).powi(2);
        }
        total_held += held.len();
    }

    if total_held == 0 {
        f64::INFINITY
    } else {
        total_se / total_held as f64
    }
}
