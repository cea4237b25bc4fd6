//! Ordinary least squares via the normal equations.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::FittedModel;
use crate::error::{AvimapError, Result};

/// Two-sided 5% critical value under a normal approximation.
const SIGNIFICANCE_T: f64 = 1.96;

/// Tiny diagonal ridge added to the Gram matrix for numerical stability
/// with near-collinear or constant columns.
const STABILIZING_RIDGE: f64 = 1e-8;

/// An unpenalized least-squares fit with per-coefficient inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsFit {
    pub model: FittedModel,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    /// |t| > 1.96, two-sided at 0.05. A judgment aid for the selection
    /// heuristic, not a formal hypothesis test.
    pub significant: Vec<bool>,
}

/// Fit ratio on the predictor columns with an intercept.
///
/// Fails with `InsufficientData` when fewer rows than predictors + 1
/// remain, and `DegenerateTarget` when the target has zero variance.
pub fn fit_ols(x: &Array2<f64>, y: &Array1<f64>, names: &[String]) -> Result<OlsFit> {
    let n = x.nrows();
    let p = x.ncols();
    if n < p + 1 {
        return Err(AvimapError::InsufficientData {
            rows: n,
            predictors: p,
        });
    }
    check_target_variance(y)?;

    // Augment with an intercept column.
    let mut design = Array2::ones((n, p + 1));
    for i in 0..n {
        for j in 0..p {
            design[[i, j + 1]] = x[[i, j]];
        }
    }

    let mut gram = design.t().dot(&design);
    for d in 0..p + 1 {
        gram[[d, d]] += STABILIZING_RIDGE;
    }
    let moment = design.t().dot(y);

    let chol = Cholesky::decompose(&gram).ok_or_else(|| AvimapError::Config(
        "normal equations are not positive definite".to_string(),
    ))?;
    let beta = chol.solve(&moment);

    // Residual variance and coefficient covariance diagonal.
    let fitted = design.dot(&beta);
    let rss: f64 = y
        .iter()
        .zip(fitted.iter())
        .map(|(yi, fi)| (yi - fi).powi(2))
        .sum();
    let dof = (n - p - 1).max(1) as f64;
    let sigma2 = rss / dof;

    let mut std_errors = Vec::with_capacity(p);
    let mut t_values = Vec::with_capacity(p);
    let mut significant = Vec::with_capacity(p);
    for j in 0..p {
        // (XᵀX)⁻¹ column via a unit-vector solve.
        let mut unit = Array1::zeros(p + 1);
        unit[j + 1] = 1.0;
        let inv_col = chol.solve(&unit);
        let se = (sigma2 * inv_col[j + 1]).max(0.0).sqrt();
        let t = if se > 0.0 { beta[j + 1] / se } else { 0.0 };
        std_errors.push(se);
        t_values.push(t);
        significant.push(t.abs() > SIGNIFICANCE_T);
    }

    Ok(OlsFit {
        model: FittedModel {
            names: names.to_vec(),
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
        },
        std_errors,
        t_values,
        significant,
    })
}

/// Zero target variance means cross-validation folds cannot be scored.
pub fn check_target_variance(y: &Array1<f64>) -> Result<()> {
    let n = y.len();
    if n == 0 {
        return Err(AvimapError::DegenerateTarget { rows: 0 });
    }
    let mean = y.sum() / n as f64;
    let var: f64 = y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    if var <= f64::EPSILON {
        return Err(AvimapError::DegenerateTarget { rows: n });
    }
    Ok(())
}

/// Cholesky factorization of a symmetric positive-definite matrix.
pub struct Cholesky {
    lower: Array2<f64>,
}

impl Cholesky {
    /// Decompose `a = L Lᵀ`; `None` if `a` is not positive definite.
    pub fn decompose(a: &Array2<f64>) -> Option<Self> {
        let n = a.nrows();
        let mut lower = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let mut sum = a[[i, j]];
                for k in 0..j {
                    sum -= lower[[i, k]] * lower[[j, k]];
                }
                if i == j {
                    if sum <= 0.0 {
                        return None;
                    }
                    lower[[i, j]] = sum.sqrt();
                } else {
                    lower[[i, j]] = sum / lower[[j, j]];
                }
            }
        }
        Some(Self { lower })
    }

    /// Solve `a x = b` by forward then back substitution.
    pub fn solve(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = b.len();
        let l = &self.lower;

        let mut z = Array1::zeros(n);
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= l[[i, k]] * z[k];
            }
            z[i] = sum / l[[i, i]];
        }

        let mut x = Array1::zeros(n);
        for i in (0..n).rev() {
            let mut sum = z[i];
            for k in i + 1..n {
                sum -= l[[k, i]] * x[k];
            }
            x[i] = sum / l[[i, i]];
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ols_recovers_known_line() {
        // y = 1 + 2a - 3b, noiseless.
        let x = array![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 1.0],
            [2.0, 3.0],
        ];
        let y = x.column(0).mapv(|a| 2.0 * a) - x.column(1).mapv(|b| 3.0 * b) + 1.0;
        let names = vec!["a".to_string(), "b".to_string()];

        let fit = fit_ols(&x, &y, &names).unwrap();
        assert!((fit.model.intercept - 1.0).abs() < 1e-5);
        assert!((fit.model.coefficients[0] - 2.0).abs() < 1e-5);
        assert!((fit.model.coefficients[1] + 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_insufficient_data() {
        let x = array![[1.0, 2.0], [2.0, 1.0]];
        let y = array![1.0, 2.0];
        let names = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            fit_ols(&x, &y, &names),
            Err(AvimapError::InsufficientData { rows: 2, predictors: 2 })
        ));
    }

    #[test]
    fn test_degenerate_target() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.5, 0.5, 0.5, 0.5];
        let names = vec!["a".to_string()];
        assert!(matches!(
            fit_ols(&x, &y, &names),
            Err(AvimapError::DegenerateTarget { rows: 4 })
        ));
    }

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![10.0, 8.0];
        let x = Cholesky::decompose(&a).unwrap().solve(&b);
        // Check a·x = b.
        assert!((4.0 * x[0] + 2.0 * x[1] - 10.0).abs() < 1e-10);
        assert!((2.0 * x[0] + 3.0 * x[1] - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_predict_matches_fit() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![2.1, 4.2, 5.9, 8.1, 9.9];
        let names = vec!["a".to_string()];
        let fit = fit_ols(&x, &y, &names).unwrap();
        let at_three = fit.model.predict(&[3.0]);
        assert!((at_three - 6.04).abs() < 0.2);
    }
}
