//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Avimap: gridded bird-occurrence surfaces from checklists, weather, and
/// land cover
#[derive(Parser)]
#[command(name = "avimap")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline: ingest, zero-fill, match, model, simulate
    Run(RunArgs),

    /// Zero-fill checklists and match them to weather stations
    Match(MatchArgs),

    /// Fit and compare occurrence models over a matched table
    Model(ModelArgs),

    /// Simulate the predicted-occurrence surface from a matched table
    Simulate(SimulateArgs),
}

/// Paths to the four tabular inputs.
#[derive(Args)]
pub struct InputArgs {
    /// Checklist CSV
    #[arg(long, value_name = "FILE")]
    pub checklists: PathBuf,

    /// Species detection CSV
    #[arg(long, value_name = "FILE")]
    pub detections: PathBuf,

    /// Weather station CSV
    #[arg(long, value_name = "FILE")]
    pub stations: PathBuf,

    /// Daily weather CSV
    #[arg(long, value_name = "FILE")]
    pub weather: PathBuf,
}

/// Study-region boundary.
#[derive(Args)]
pub struct BoundsArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub min_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub min_lon: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub max_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub max_lon: f64,
}

/// Land-cover source: a JSON raster file, or a uniform class when none is
/// given.
#[derive(Args)]
pub struct LandCoverArgs {
    /// JSON land-cover raster (bounds, cell_size, classes)
    #[arg(long, value_name = "FILE")]
    pub land_cover: Option<PathBuf>,

    /// Uniform land-cover class used when no raster is given
    #[arg(long, default_value = "41")]
    pub land_cover_class: i64,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(flatten)]
    pub bounds: BoundsArgs,

    #[command(flatten)]
    pub land_cover: LandCoverArgs,

    /// Output directory for run artifacts
    #[arg(short, long, default_value = "avimap-out")]
    pub output: PathBuf,

    /// Station match cutoff in kilometers
    #[arg(long, default_value = "50.0")]
    pub radius_km: f64,

    /// Temperature bin width in degrees C
    #[arg(long, default_value = "1.0")]
    pub temp_bin_width: f64,

    /// Snowfall bin width in millimeters
    #[arg(long, default_value = "5.0")]
    pub snow_bin_width: f64,

    /// Simulation grid cell size in degrees
    #[arg(long, default_value = "0.1")]
    pub cell_size: f64,

    /// Monte-Carlo points per grid cell
    #[arg(long, default_value = "1000")]
    pub points_per_cell: usize,

    /// L1 share of the elastic-net blend
    #[arg(long, default_value = "0.5")]
    pub alpha: f64,

    /// Random seed for the simulation
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Cross-validation folds for penalty selection
    #[arg(long, default_value = "5")]
    pub k_folds: usize,

    /// Lambda grid size for penalty selection
    #[arg(long, default_value = "20")]
    pub n_lambdas: usize,
}

#[derive(Args)]
pub struct MatchArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(flatten)]
    pub land_cover: LandCoverArgs,

    /// Output path for the matched table
    #[arg(short, long, default_value = "matched.csv")]
    pub output: PathBuf,

    /// Station match cutoff in kilometers
    #[arg(long, default_value = "50.0")]
    pub radius_km: f64,
}

#[derive(Args)]
pub struct ModelArgs {
    /// Matched table written by `avimap match` or `avimap run`
    #[arg(value_name = "MATCHED_FILE")]
    pub matched: PathBuf,

    /// Output directory for bins.csv and coefficients.json
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Temperature bin width in degrees C
    #[arg(long, default_value = "1.0")]
    pub temp_bin_width: f64,

    /// Snowfall bin width in millimeters
    #[arg(long, default_value = "5.0")]
    pub snow_bin_width: f64,

    /// L1 share of the elastic-net blend
    #[arg(long, default_value = "0.5")]
    pub alpha: f64,

    /// Cross-validation folds for penalty selection
    #[arg(long, default_value = "5")]
    pub k_folds: usize,

    /// Lambda grid size for penalty selection
    #[arg(long, default_value = "20")]
    pub n_lambdas: usize,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Matched table written by `avimap match` or `avimap run`
    #[arg(value_name = "MATCHED_FILE")]
    pub matched: PathBuf,

    #[command(flatten)]
    pub bounds: BoundsArgs,

    #[command(flatten)]
    pub land_cover: LandCoverArgs,

    /// Output path for the prediction surface
    #[arg(short, long, default_value = "predictions.csv")]
    pub output: PathBuf,

    /// Simulation grid cell size in degrees
    #[arg(long, default_value = "0.1")]
    pub cell_size: f64,

    /// Monte-Carlo points per grid cell
    #[arg(long, default_value = "1000")]
    pub points_per_cell: usize,

    /// Random seed for the simulation
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Temperature bin width used when refitting the scoring model
    #[arg(long, default_value = "1.0")]
    pub temp_bin_width: f64,

    /// Snowfall bin width used when refitting the scoring model
    #[arg(long, default_value = "5.0")]
    pub snow_bin_width: f64,

    /// L1 share of the elastic-net blend
    #[arg(long, default_value = "0.5")]
    pub alpha: f64,

    /// Cross-validation folds for penalty selection
    #[arg(long, default_value = "5")]
    pub k_folds: usize,

    /// Lambda grid size for penalty selection
    #[arg(long, default_value = "20")]
    pub n_lambdas: usize,
}
