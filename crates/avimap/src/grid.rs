//! Uniform grid partition of the study region.

use serde::{Deserialize, Serialize};

use crate::error::{AvimapError, Result};
use crate::geo::BoundingBox;

/// Default grid cell edge in degrees.
pub const DEFAULT_CELL_SIZE_DEGREES: f64 = 0.1;

/// One cell of the study-region grid. Static once the grid is constructed
/// for a given cell size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub id: usize,
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GridCell {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// A uniform grid over the region's bounding box. Cells are ordered
/// row-major, south to north then west to east, with sequential ids; the
/// traversal order is part of the simulation's determinism contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub bounds: BoundingBox,
    pub cell_size_degrees: f64,
    pub rows: usize,
    pub cols: usize,
    cells: Vec<GridCell>,
}

impl Grid {
    pub fn build(bounds: BoundingBox, cell_size_degrees: f64) -> Result<Self> {
        if cell_size_degrees <= 0.0 {
            return Err(AvimapError::Config(format!(
                "grid cell size must be positive, got {cell_size_degrees}"
            )));
        }
        if bounds.lat_span() <= 0.0 || bounds.lon_span() <= 0.0 {
            return Err(AvimapError::Config(
                "study region bounding box is empty".to_string(),
            ));
        }

        let rows = (bounds.lat_span() / cell_size_degrees).ceil() as usize;
        let cols = (bounds.lon_span() / cell_size_degrees).ceil() as usize;

        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let min_lat = bounds.min_lat + row as f64 * cell_size_degrees;
                let min_lon = bounds.min_lon + col as f64 * cell_size_degrees;
                cells.push(GridCell {
                    id: row * cols + col,
                    min_lat,
                    min_lon,
                    max_lat: (min_lat + cell_size_degrees).min(bounds.max_lat),
                    max_lon: (min_lon + cell_size_degrees).min(bounds.max_lon),
                });
            }
        }

        Ok(Self {
            bounds,
            cell_size_degrees,
            rows,
            cols,
            cells,
        })
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
