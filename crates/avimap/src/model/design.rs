//! Feature-matrix assembly from matched observations.

use ndarray::{Array1, Array2};

use crate::binning::BinningResult;
use crate::matching::MatchedObservation;

/// The fixed predictor set, in design-matrix column order.
pub const PREDICTOR_NAMES: [&str; 8] = [
    "tmax",
    "tmin",
    "precipitation",
    "snowfall",
    "snow_depth",
    "land_cover",
    "longitude",
    "latitude",
];

/// A design matrix plus target, rows restricted to observations with a
/// complete covariate set.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub names: Vec<String>,
}

impl Dataset {
    pub fn rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn predictors(&self) -> usize {
        self.x.ncols()
    }
}

/// The covariate vector for one matched observation, in `PREDICTOR_NAMES`
/// order. `None` when any feature is missing.
pub fn feature_vector(obs: &MatchedObservation) -> Option<[f64; 8]> {
    Some([
        obs.tmax?,
        obs.tmin?,
        obs.precipitation?,
        obs.snowfall?,
        obs.snow_depth?,
        obs.land_cover? as f64,
        obs.record.longitude,
        obs.record.latitude,
    ])
}

/// Assemble the modeling dataset. Each retained row's target is the
/// occurrence ratio of the environmental bin the observation falls in;
/// rows with any missing feature are dropped.
pub fn build_dataset(observations: &[MatchedObservation], bins: &BinningResult) -> Dataset {
    let mut rows: Vec<[f64; 8]> = Vec::new();
    let mut targets: Vec<f64> = Vec::new();

    for obs in observations {
        let Some(features) = feature_vector(obs) else {
            continue;
        };
        let avg_temp = (features[0] + features[1]) / 2.0;
        let Some(ratio) = bins.ratio_for(avg_temp, features[3]) else {
            continue;
        };
        rows.push(features);
        targets.push(ratio);
    }

    let n = rows.len();
    let mut x = Array2::zeros((n, PREDICTOR_NAMES.len()));
    for (i, row) in rows.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            x[[i, j]] = *value;
        }
    }

    Dataset {
        x,
        y: Array1::from(targets),
        names: PREDICTOR_NAMES.iter().map(|s| s.to_string()).collect(),
    }
}
