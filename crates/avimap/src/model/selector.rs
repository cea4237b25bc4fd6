//! Fitting the four model variants and the coefficient-comparison drop
//! heuristic.

use serde::{Deserialize, Serialize};

use super::cv::select_lambda;
use super::design::Dataset;
use super::linear::{OlsFit, fit_ols};
use super::penalized::{PenalizedFit, fit_elastic_net};
use crate::error::{AvimapError, Result};

/// Fraction of the largest penalized |coefficient| below which a
/// coefficient counts as "near zero" for the drop rule.
const NEAR_ZERO_FRACTION: f64 = 0.01;

/// All four fits plus the removal recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub full: OlsFit,
    pub lasso: PenalizedFit,
    pub ridge: PenalizedFit,
    pub elastic: PenalizedFit,
    /// Predictors recommended for removal: near-zero under every penalized
    /// variant while reported significant by the unpenalized fit. A
    /// judgment rule with a documented threshold, not a hypothesis test.
    pub drop_candidates: Vec<String>,
}

/// Fits an unregularized linear model and three penalized variants over
/// the binned covariates, cross-validating penalty strength.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    k_folds: usize,
    n_lambdas: usize,
    elastic_alpha: f64,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self {
            k_folds: 5,
            n_lambdas: 20,
            elastic_alpha: 0.5,
        }
    }
}

impl ModelSelector {
    pub fn new(k_folds: usize, n_lambdas: usize, elastic_alpha: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&elastic_alpha) {
            return Err(AvimapError::Config(format!(
                "elastic alpha must be in [0, 1], got {elastic_alpha}"
            )));
        }
        Ok(Self {
            k_folds,
            n_lambdas,
            elastic_alpha,
        })
    }

    /// Fit all four variants. Fails with `InsufficientData` or
    /// `DegenerateTarget`; no partial model is returned.
    pub fn fit(&self, dataset: &Dataset) -> Result<ModelComparison> {
        let full = fit_ols(&dataset.x, &dataset.y, &dataset.names)?;

        let lasso = self.fit_penalized(dataset, 1.0)?;
        let ridge = self.fit_penalized(dataset, 0.0)?;
        let elastic = self.fit_penalized(dataset, self.elastic_alpha)?;

        let drop_candidates = recommend_drops(&full, &[&lasso, &ridge, &elastic], &dataset.names);

        Ok(ModelComparison {
            full,
            lasso,
            ridge,
            elastic,
            drop_candidates,
        })
    }

    fn fit_penalized(&self, dataset: &Dataset, l1_ratio: f64) -> Result<PenalizedFit> {
        let path = select_lambda(
            &dataset.x,
            &dataset.y,
            l1_ratio,
            self.k_folds,
            self.n_lambdas,
        )?;
        let model = fit_elastic_net(
            &dataset.x,
            &dataset.y,
            &dataset.names,
            path.best_lambda,
            l1_ratio,
        );
        Ok(PenalizedFit {
            model,
            lambda: path.best_lambda,
            l1_ratio,
            cv_mse: path.best_mse,
        })
    }
}

/// A predictor is recommended for removal when its penalized coefficient is
/// near zero in every penalized fit while the OLS fit calls it significant.
fn recommend_drops(full: &OlsFit, penalized: &[&PenalizedFit], names: &[String]) -> Vec<String> {
    names
        .iter()
        .enumerate()
        .filter(|(j, _)| {
            full.significant[*j]
                && penalized.iter().all(|fit| {
                    let coefs = &fit.model.coefficients;
                    let max_mag = coefs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
                    coefs[*j].abs() < NEAR_ZERO_FRACTION * max_mag
                })
        })
        .map(|(_, name)| name.clone())
        .collect()
}
