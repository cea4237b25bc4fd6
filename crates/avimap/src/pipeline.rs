//! Pipeline facade: wires ingestion, zero-filling, matching, binning,
//! model selection, and grid simulation into one run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::binning::{
    BinningResult, DEFAULT_SNOW_BIN_WIDTH, DEFAULT_TEMP_BIN_WIDTH, OccurrenceRatioBinner,
};
use crate::error::{AvimapError, Result};
use crate::geo::BoundingBox;
use crate::grid::{DEFAULT_CELL_SIZE_DEGREES, Grid};
use crate::input::{
    IngestReport, SourceMetadata, read_checklists, read_daily_weather, read_detections,
    read_stations,
};
use crate::landcover::LandCover;
use crate::matching::{DEFAULT_RADIUS_KM, MatchStatus, MatchedObservation, ObservationMatcher};
use crate::model::{FittedModel, ModelComparison, ModelSelector, build_dataset};
use crate::simulate::{
    CovariateDistributions, DEFAULT_POINTS_PER_CELL, GridPrediction, GridSimulator,
};
use crate::stations::StationIndex;
use crate::weather::DailyWeatherStore;
use crate::zerofill::{PresenceAbsenceRecord, ZeroFillEngine, ZeroFillReport};

/// Recognized pipeline options with their documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Station match cutoff in kilometers.
    pub radius_km: f64,
    pub temp_bin_width: f64,
    pub snow_bin_width: f64,
    pub grid_cell_size_degrees: f64,
    pub points_per_cell: usize,
    /// L1 share of the elastic blend.
    pub elastic_alpha: f64,
    pub random_seed: u64,
    /// Cross-validation folds for penalty selection.
    pub k_folds: usize,
    /// Lambda grid size for penalty selection.
    pub n_lambdas: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            temp_bin_width: DEFAULT_TEMP_BIN_WIDTH,
            snow_bin_width: DEFAULT_SNOW_BIN_WIDTH,
            grid_cell_size_degrees: DEFAULT_CELL_SIZE_DEGREES,
            points_per_cell: DEFAULT_POINTS_PER_CELL,
            elastic_alpha: 0.5,
            random_seed: 0,
            k_folds: 5,
            n_lambdas: 20,
        }
    }
}

/// Paths to the tabular inputs plus the study-region bounds.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub checklists: PathBuf,
    pub detections: PathBuf,
    pub stations: PathBuf,
    pub weather: PathBuf,
    /// Region boundary used to build the simulation grid.
    pub bounds: BoundingBox,
}

/// Per-input drop counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub checklists: IngestReport,
    pub detections: IngestReport,
    pub stations: IngestReport,
    pub weather: IngestReport,
}

/// Headline numbers for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub observations: usize,
    pub matched: usize,
    pub unmatched_too_far: usize,
    pub unmatched_no_data: usize,
    pub match_rate: f64,
    pub presence_rate: f64,
    pub bin_groups: usize,
    pub grid_cells: usize,
    /// Which fit scored the simulation.
    pub scoring_model: String,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub sources: Vec<SourceMetadata>,
    pub ingest: IngestSummary,
    pub zero_fill: ZeroFillReport,
    pub matched: Vec<MatchedObservation>,
    pub bins: BinningResult,
    pub models: ModelComparison,
    pub predictions: Vec<GridPrediction>,
    pub summary: RunSummary,
}

/// The end-to-end occurrence-surface pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline against on-disk inputs and a land-cover
    /// point-query service.
    pub fn run(&self, inputs: &PipelineInputs, land_cover: &dyn LandCover) -> Result<RunArtifacts> {
        let checklists = read_checklists(&inputs.checklists)?;
        let detections = read_detections(&inputs.detections)?;
        let stations = read_stations(&inputs.stations)?;
        let weather = read_daily_weather(&inputs.weather)?;

        let sources = vec![
            checklists.source.clone(),
            detections.source.clone(),
            stations.source.clone(),
            weather.source.clone(),
        ];
        let ingest = IngestSummary {
            checklists: checklists.report.clone(),
            detections: detections.report.clone(),
            stations: stations.report.clone(),
            weather: weather.report.clone(),
        };

        let (records, zero_fill) =
            ZeroFillEngine::new().reconcile(&checklists.rows, &detections.rows);
        if records.is_empty() {
            return Err(AvimapError::EmptyData(
                "no checklists survived zero-filling".to_string(),
            ));
        }

        let station_index = StationIndex::new(stations.rows);
        let weather_store = DailyWeatherStore::new(weather.rows);
        let matched = self.match_and_enrich(&records, &station_index, &weather_store, land_cover)?;

        let (bins, models) = self.fit_models(&matched)?;
        let scoring = scoring_model(&models);
        let predictions = self.simulate(&matched, &scoring.1, inputs.bounds, land_cover)?;

        let summary = self.summarize(&matched, &bins, &predictions, scoring.0);

        Ok(RunArtifacts {
            sources,
            ingest,
            zero_fill,
            matched,
            bins,
            models,
            predictions,
            summary,
        })
    }

    /// Match presence/absence records to weather and attach land cover at
    /// each matched observation's coordinate.
    pub fn match_and_enrich(
        &self,
        records: &[PresenceAbsenceRecord],
        stations: &StationIndex,
        weather: &DailyWeatherStore,
        land_cover: &dyn LandCover,
    ) -> Result<Vec<MatchedObservation>> {
        let matcher = ObservationMatcher::with_radius(stations, weather, self.config.radius_km);
        let mut matched = matcher.match_all(records);
        for obs in &mut matched {
            if obs.status == MatchStatus::Matched {
                obs.land_cover =
                    Some(land_cover.class_at(obs.record.latitude, obs.record.longitude)?);
            }
        }
        Ok(matched)
    }

    /// Bin the matched table and fit all four model variants.
    pub fn fit_models(
        &self,
        matched: &[MatchedObservation],
    ) -> Result<(BinningResult, ModelComparison)> {
        let binner =
            OccurrenceRatioBinner::new(self.config.temp_bin_width, self.config.snow_bin_width);
        let bins = binner.bin(matched);
        let dataset = build_dataset(matched, &bins);
        let selector = ModelSelector::new(
            self.config.k_folds,
            self.config.n_lambdas,
            self.config.elastic_alpha,
        )?;
        let models = selector.fit(&dataset)?;
        Ok((bins, models))
    }

    /// Simulate the predicted-occurrence surface over the region grid.
    pub fn simulate(
        &self,
        matched: &[MatchedObservation],
        model: &FittedModel,
        bounds: BoundingBox,
        land_cover: &dyn LandCover,
    ) -> Result<Vec<GridPrediction>> {
        let distributions = CovariateDistributions::fit(matched)?;
        let grid = Grid::build(bounds, self.config.grid_cell_size_degrees)?;
        let simulator = GridSimulator::new(self.config.points_per_cell, self.config.random_seed);
        simulator.simulate(&grid, model, &distributions, land_cover)
    }

    fn summarize(
        &self,
        matched: &[MatchedObservation],
        bins: &BinningResult,
        predictions: &[GridPrediction],
        scoring_model: &str,
    ) -> RunSummary {
        let observations = matched.len();
        let matched_count = matched
            .iter()
            .filter(|m| m.status == MatchStatus::Matched)
            .count();
        let too_far = matched
            .iter()
            .filter(|m| m.status == MatchStatus::TooFar)
            .count();
        let no_data = matched
            .iter()
            .filter(|m| m.status == MatchStatus::NoDataThatDay)
            .count();
        let presences = matched.iter().filter(|m| m.record.presence).count();

        RunSummary {
            observations,
            matched: matched_count,
            unmatched_too_far: too_far,
            unmatched_no_data: no_data,
            match_rate: ratio(matched_count, observations),
            presence_rate: ratio(presences, observations),
            bin_groups: bins.groups.len(),
            grid_cells: predictions.len(),
            scoring_model: scoring_model.to_string(),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// The penalized variant with the lowest held-out error scores the
/// simulation.
pub fn scoring_model(models: &ModelComparison) -> (&'static str, FittedModel) {
    let candidates = [
        ("lasso", &models.lasso),
        ("ridge", &models.ridge),
        ("elastic", &models.elastic),
    ];
    let best = candidates
        .iter()
        .min_by(|a, b| {
            a.1.cv_mse
                .partial_cmp(&b.1.cv_mse)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .expect("non-empty candidate list");
    (best.0, best.1.model.clone())
}
