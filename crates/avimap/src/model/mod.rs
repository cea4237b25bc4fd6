//! Regularized linear modeling over the binned occurrence-ratio target.

mod cv;
mod design;
mod linear;
mod penalized;
mod selector;

pub use cv::{LambdaPath, select_lambda};
pub use design::{Dataset, PREDICTOR_NAMES, build_dataset, feature_vector};
pub use linear::{OlsFit, fit_ols};
pub use penalized::{PenalizedFit, fit_elastic_net};
pub use selector::{ModelComparison, ModelSelector};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A fitted linear model on the original (unstandardized) feature scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl FittedModel {
    /// Score one covariate vector. Features must be in `names` order.
    pub fn predict(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.coefficients.len());
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    /// Named predictor → weight table, in predictor order.
    pub fn coefficient_table(&self) -> IndexMap<String, f64> {
        self.names
            .iter()
            .cloned()
            .zip(self.coefficients.iter().copied())
            .collect()
    }
}
