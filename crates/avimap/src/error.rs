//! Error types for the avimap library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for avimap operations.
#[derive(Debug, Error)]
pub enum AvimapError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Empty input or no rows survived ingestion.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A static reference dataset is unavailable. Fatal, no retry: inputs
    /// are one-shot batch reads, not network calls.
    #[error("Missing external resource '{path}': {what}")]
    MissingResource { path: PathBuf, what: String },

    /// A land-cover point query fell outside raster coverage.
    #[error("Land cover query outside coverage at ({lat}, {lon})")]
    OutsideCoverage { lat: f64, lon: f64 },

    /// Too few usable rows remain to fit the requested model.
    #[error("Insufficient data: {rows} rows remain for {predictors} predictors")]
    InsufficientData { rows: usize, predictors: usize },

    /// The regression target has zero variance; folds cannot be scored.
    #[error("Degenerate target: zero variance across {rows} rows")]
    DegenerateTarget { rows: usize },
}

/// Result type alias for avimap operations.
pub type Result<T> = std::result::Result<T, AvimapError>;
