//! Penalized least squares via cyclic coordinate descent.
//!
//! One solver covers all three variants through the L1 mixing ratio:
//! lasso (1.0), ridge (0.0), and the fixed 50/50 elastic blend (0.5).

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::FittedModel;

const MAX_ITERATIONS: usize = 1000;
const CONVERGENCE_TOL: f64 = 1e-7;

/// A penalized fit: the refit model on the original scale plus the chosen
/// penalty strength.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenalizedFit {
    pub model: FittedModel,
    pub lambda: f64,
    pub l1_ratio: f64,
    /// Held-out mean squared error at the selected lambda.
    pub cv_mse: f64,
}

/// Per-column standardization parameters. Constant columns get a unit
/// scale and a zero coefficient; they cannot carry signal.
pub(super) struct Standardization {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub y_mean: f64,
}

pub(super) fn standardize(x: &Array2<f64>, y: &Array1<f64>) -> (Array2<f64>, Array1<f64>, Standardization) {
    let n = x.nrows();
    let p = x.ncols();
    let mut xs = x.clone();
    let mut means = Vec::with_capacity(p);
    let mut scales = Vec::with_capacity(p);

    for j in 0..p {
        let col = x.column(j);
        let mean = col.sum() / n as f64;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let scale = if var > f64::EPSILON { var.sqrt() } else { 1.0 };
        for i in 0..n {
            xs[[i, j]] = (x[[i, j]] - mean) / scale;
        }
        means.push(mean);
        scales.push(scale);
    }

    let y_mean = y.sum() / n as f64;
    let ys = y.mapv(|v| v - y_mean);

    (xs, ys, Standardization { means, scales, y_mean })
}

/// Soft-thresholding operator.
fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Coordinate descent on standardized, centered data. Returns standardized
/// coefficients.
pub(super) fn descend(
    xs: &Array2<f64>,
    ys: &Array1<f64>,
    lambda: f64,
    l1_ratio: f64,
) -> Vec<f64> {
    let n = xs.nrows();
    let p = xs.ncols();
    let n_f = n as f64;

    // Column norms (1/n)Σx²; ~1 after standardization, 0 for constants.
    let col_norms: Vec<f64> = (0..p)
        .map(|j| xs.column(j).iter().map(|v| v * v).sum::<f64>() / n_f)
        .collect();

    let mut beta = vec![0.0; p];
    let mut residual: Array1<f64> = ys.clone();

    for _ in 0..MAX_ITERATIONS {
        let mut max_delta: f64 = 0.0;
        for j in 0..p {
            if col_norms[j] <= f64::EPSILON {
                continue;
            }
            let old = beta[j];
            // Partial residual correlation for coordinate j.
            let rho = xs
                .column(j)
                .iter()
                .zip(residual.iter())
                .map(|(xij, ri)| xij * (ri + xij * old))
                .sum::<f64>()
                / n_f;

            let new = soft_threshold(rho, lambda * l1_ratio)
                / (col_norms[j] + lambda * (1.0 - l1_ratio));

            if new != old {
                let delta = new - old;
                for i in 0..n {
                    residual[i] -= xs[[i, j]] * delta;
                }
                max_delta = max_delta.max(delta.abs());
            }
            beta[j] = new;
        }
        if max_delta < CONVERGENCE_TOL {
            break;
        }
    }

    beta
}

/// Fit an elastic-net model at a fixed penalty strength and return it on
/// the original feature scale.
pub fn fit_elastic_net(
    x: &Array2<f64>,
    y: &Array1<f64>,
    names: &[String],
    lambda: f64,
    l1_ratio: f64,
) -> FittedModel {
    let (xs, ys, std) = standardize(x, y);
    let beta_std = descend(&xs, &ys, lambda, l1_ratio);

    let coefficients: Vec<f64> = beta_std
        .iter()
        .zip(std.scales.iter())
        .map(|(b, s)| b / s)
        .collect();
    let intercept = std.y_mean
        - coefficients
            .iter()
            .zip(std.means.iter())
            .map(|(c, m)| c * m)
            .sum::<f64>();

    FittedModel {
        names: names.to_vec(),
        intercept,
        coefficients,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy() -> (Array2<f64>, Array1<f64>, Vec<String>) {
        // y depends on the first column only.
        let x = array![
            [1.0, 0.3],
            [2.0, -0.1],
            [3.0, 0.2],
            [4.0, -0.3],
            [5.0, 0.1],
            [6.0, 0.0],
        ];
        let y = array![2.0, 4.1, 5.9, 8.2, 10.0, 12.1];
        (x, y, vec!["signal".to_string(), "noise".to_string()])
    }

    #[test]
    fn test_zero_lambda_matches_least_squares() {
        let (x, y, names) = toy();
        let fit = fit_elastic_net(&x, &y, &names, 0.0, 0.5);
        assert!((fit.coefficients[0] - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_heavy_lasso_zeroes_noise() {
        let (x, y, names) = toy();
        let fit = fit_elastic_net(&x, &y, &names, 0.5, 1.0);
        assert_eq!(fit.coefficients[1], 0.0);
        assert!(fit.coefficients[0] > 0.5);
    }

    #[test]
    fn test_ridge_shrinks_but_keeps() {
        let (x, y, names) = toy();
        let unpenalized = fit_elastic_net(&x, &y, &names, 0.0, 0.0);
        let penalized = fit_elastic_net(&x, &y, &names, 10.0, 0.0);
        assert!(penalized.coefficients[0].abs() < unpenalized.coefficients[0].abs());
        assert!(penalized.coefficients[0].abs() > 0.0);
    }

    #[test]
    fn test_constant_column_gets_zero() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0], [4.0, 7.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let names = vec!["a".to_string(), "const".to_string()];
        let fit = fit_elastic_net(&x, &y, &names, 0.01, 0.5);
        assert_eq!(fit.coefficients[1], 0.0);
    }

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }
}
