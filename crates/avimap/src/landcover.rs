//! Land-cover point queries.
//!
//! The raster itself is an external collaborator: the pipeline only needs a
//! black-box `(lat, lon) -> class code` lookup. A query outside coverage is
//! fatal per the no-retry policy for static reference data.

use std::path::Path;

use serde::Deserialize;

use crate::error::{AvimapError, Result};
use crate::geo::BoundingBox;

/// Black-box point-query service returning a categorical land-cover code
/// for a coordinate.
pub trait LandCover {
    fn class_at(&self, lat: f64, lon: f64) -> Result<i64>;
}

/// Constant-class land cover, for tests and development runs without a
/// raster.
#[derive(Debug, Clone, Copy)]
pub struct UniformLandCover {
    pub class: i64,
}

impl UniformLandCover {
    pub fn new(class: i64) -> Self {
        Self { class }
    }
}

impl LandCover for UniformLandCover {
    fn class_at(&self, _lat: f64, _lon: f64) -> Result<i64> {
        Ok(self.class)
    }
}

/// A regular lat/lon raster of class codes held in memory, queried by
/// snapping the point to its containing cell.
#[derive(Debug, Clone)]
pub struct GriddedLandCover {
    bounds: BoundingBox,
    cell_size: f64,
    cols: usize,
    rows: usize,
    /// Row-major, south-to-north then west-to-east.
    classes: Vec<i64>,
}

impl GriddedLandCover {
    /// Build a raster from per-cell class codes. `classes` must hold
    /// `rows * cols` entries, row-major from the southwest corner.
    pub fn new(bounds: BoundingBox, cell_size: f64, classes: Vec<i64>) -> Result<Self> {
        if cell_size <= 0.0 {
            return Err(AvimapError::Config(format!(
                "raster cell size must be positive, got {cell_size}"
            )));
        }
        let rows = (bounds.lat_span() / cell_size).ceil() as usize;
        let cols = (bounds.lon_span() / cell_size).ceil() as usize;
        if classes.len() != rows * cols {
            return Err(AvimapError::Config(format!(
                "raster expects {} classes for {rows}x{cols} cells, got {}",
                rows * cols,
                classes.len()
            )));
        }
        Ok(Self {
            bounds,
            cell_size,
            cols,
            rows,
            classes,
        })
    }

    /// Load a raster from a JSON file holding `bounds`, `cell_size`, and the
    /// row-major `classes` array.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|e| AvimapError::MissingResource {
            path: path.to_path_buf(),
            what: e.to_string(),
        })?;
        let raw: RasterFile = serde_json::from_slice(&contents)?;
        Self::new(raw.bounds, raw.cell_size, raw.classes)
    }
}

#[derive(Deserialize)]
struct RasterFile {
    bounds: BoundingBox,
    cell_size: f64,
    classes: Vec<i64>,
}

impl LandCover for GriddedLandCover {
    fn class_at(&self, lat: f64, lon: f64) -> Result<i64> {
        if !self.bounds.contains(lat, lon) {
            return Err(AvimapError::OutsideCoverage { lat, lon });
        }
        let row = (((lat - self.bounds.min_lat) / self.cell_size) as usize).min(self.rows - 1);
        let col = (((lon - self.bounds.min_lon) / self.cell_size) as usize).min(self.cols - 1);
        Ok(self.classes[row * self.cols + col])
    }
}
