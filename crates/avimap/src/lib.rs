//! Avimap: fuses irregularly-sampled bird checklist observations with
//! daily weather-station readings and a land-cover raster into a gridded
//! occurrence-likelihood surface.
//!
//! The pipeline, leaf to root: zero-filling complete checklists into a
//! presence/absence table, matching each observation to the nearest
//! weather station with an eligible record on the same date, binning the
//! matched covariates into an empirical occurrence-ratio target, fitting
//! and comparing regularized linear models over it, and Monte-Carlo
//! simulating a covariate field over the study grid to produce per-cell
//! predictions.
//!
//! # Example
//!
//! ```no_run
//! use avimap::{BoundingBox, Pipeline, PipelineInputs, UniformLandCover};
//!
//! let inputs = PipelineInputs {
//!     checklists: "checklists.csv".into(),
//!     detections: "detections.csv".into(),
//!     stations: "stations.csv".into(),
//!     weather: "weather.csv".into(),
//!     bounds: BoundingBox::new(40.0, -80.0, 45.0, -71.0),
//! };
//! let artifacts = Pipeline::new().run(&inputs, &UniformLandCover::new(41)).unwrap();
//! println!("match rate: {:.1}%", artifacts.summary.match_rate * 100.0);
//! ```

pub mod binning;
pub mod error;
pub mod geo;
pub mod grid;
pub mod input;
pub mod landcover;
pub mod matching;
pub mod model;
pub mod output;
pub mod simulate;
pub mod stations;
pub mod weather;
pub mod zerofill;

mod pipeline;

pub use binning::{BinnedGroup, BinningResult, OccurrenceRatioBinner};
pub use error::{AvimapError, Result};
pub use geo::{BoundingBox, haversine_km};
pub use grid::{Grid, GridCell};
pub use input::{IngestReport, Ingested, SourceMetadata, read_matched_csv};
pub use landcover::{GriddedLandCover, LandCover, UniformLandCover};
pub use matching::{MatchStatus, MatchedObservation, ObservationMatcher};
pub use model::{FittedModel, ModelComparison, ModelSelector};
pub use pipeline::{
    IngestSummary, Pipeline, PipelineConfig, PipelineInputs, RunArtifacts, RunSummary,
    scoring_model,
};
pub use simulate::{CovariateDistributions, GridPrediction, GridSimulator};
pub use stations::{StationIndex, WeatherStation};
pub use weather::{DailyWeatherRecord, DailyWeatherStore};
pub use zerofill::{Checklist, Detection, PresenceAbsenceRecord, Protocol, ZeroFillEngine};
