//! Discretizing matched observations into environmental bins and computing
//! the empirical occurrence-ratio target.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::matching::MatchedObservation;

/// Default temperature bin width, °C.
pub const DEFAULT_TEMP_BIN_WIDTH: f64 = 1.0;
/// Default snowfall bin width, mm.
pub const DEFAULT_SNOW_BIN_WIDTH: f64 = 5.0;

/// A combination of temperature-bin and snowfall-bin index, with the share
/// of all observations falling in that bin.
///
/// The ratio is not "probability of presence": it is the fraction of all
/// retained observations sharing this environmental bin, used as the
/// regression target under a frequency-as-likelihood convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedGroup {
    pub temp_bin: i64,
    pub snow_bin: i64,
    pub count: usize,
    pub ratio: f64,
}

/// Result of one binning pass. Bins are anchored at the dataset's observed
/// minimum, not at zero, so bin boundaries shift if the minimum changes
/// between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningResult {
    pub temp_bin_width: f64,
    pub snow_bin_width: f64,
    /// Observed minimum average temperature (the temperature bin anchor).
    pub temp_min: f64,
    /// Observed minimum snowfall (the snowfall bin anchor).
    pub snow_min: f64,
    /// Observations that entered a bin.
    pub total: usize,
    /// Groups in first-seen order.
    pub groups: Vec<BinnedGroup>,
}

impl BinningResult {
    /// Bin key for a covariate pair, or `None` when the result is empty.
    pub fn key_for(&self, avg_temp: f64, snowfall: f64) -> Option<(i64, i64)> {
        if self.total == 0 {
            return None;
        }
        Some((
            bin_index(avg_temp, self.temp_min, self.temp_bin_width),
            bin_index(snowfall, self.snow_min, self.snow_bin_width),
        ))
    }

    /// The group ratio for a covariate pair; `None` when the pair falls in
    /// a bin no observation occupied.
    pub fn ratio_for(&self, avg_temp: f64, snowfall: f64) -> Option<f64> {
        let (temp_bin, snow_bin) = self.key_for(avg_temp, snowfall)?;
        self.groups
            .iter()
            .find(|g| g.temp_bin == temp_bin && g.snow_bin == snow_bin)
            .map(|g| g.ratio)
    }
}

/// Bin index for a continuous value with the dataset minimum as anchor.
pub fn bin_index(value: f64, min: f64, width: f64) -> i64 {
    ((value - min) / width).floor() as i64
}

/// Discretizes continuous covariates into fixed-width bins and computes,
/// per bin combination, the empirical fraction of observations sharing it.
#[derive(Debug, Clone)]
pub struct OccurrenceRatioBinner {
    temp_bin_width: f64,
    snow_bin_width: f64,
}

impl Default for OccurrenceRatioBinner {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_BIN_WIDTH, DEFAULT_SNOW_BIN_WIDTH)
    }
}

impl OccurrenceRatioBinner {
    pub fn new(temp_bin_width: f64, snow_bin_width: f64) -> Self {
        Self {
            temp_bin_width,
            snow_bin_width,
        }
    }

    /// Bin every matched observation carrying both covariates. Unmatched
    /// observations contribute nothing. Ratios across all groups sum to 1
    /// whenever any observation was binned.
    pub fn bin(&self, observations: &[MatchedObservation]) -> BinningResult {
        let pairs: Vec<(f64, f64)> = observations
            .iter()
            .filter_map(|obs| Some((obs.avg_temp?, obs.snowfall?)))
            .collect();

        if pairs.is_empty() {
            return BinningResult {
                temp_bin_width: self.temp_bin_width,
                snow_bin_width: self.snow_bin_width,
                temp_min: 0.0,
                snow_min: 0.0,
                total: 0,
                groups: Vec::new(),
            };
        }

        let temp_min = pairs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let snow_min = pairs.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);

        let mut counts: IndexMap<(i64, i64), usize> = IndexMap::new();
        for (avg_temp, snowfall) in &pairs {
            let key = (
                bin_index(*avg_temp, temp_min, self.temp_bin_width),
                bin_index(*snowfall, snow_min, self.snow_bin_width),
            );
            *counts.entry(key).or_insert(0) += 1;
        }

        let total = pairs.len();
        let groups = counts
            .into_iter()
            .map(|((temp_bin, snow_bin), count)| BinnedGroup {
                temp_bin,
                snow_bin,
                count,
                ratio: count as f64 / total as f64,
            })
            .collect();

        BinningResult {
            temp_bin_width: self.temp_bin_width,
            snow_bin_width: self.snow_bin_width,
            temp_min,
            snow_min,
            total,
            groups,
        }
    }
}
