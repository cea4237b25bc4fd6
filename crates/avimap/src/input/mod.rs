//! CSV ingestion of the tabular inputs: checklists, detections, stations,
//! daily weather.
//!
//! Row-level malformed data is filtered silently but countably; a missing
//! input file is fatal. No parser ever substitutes a default for a value
//! that failed coercion.

mod checklist;
mod matched;
mod source;
mod weather;

pub use checklist::{read_checklists, read_detections};
pub use matched::{MATCHED_COLUMNS, read_matched_csv};
pub use source::SourceMetadata;
pub use weather::{read_daily_weather, read_stations};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Counts of rows dropped during ingestion, keyed by reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Malformed-row counts per reason (e.g. "unparseable date"), in
    /// first-seen order.
    pub malformed: IndexMap<String, usize>,
}

impl IngestReport {
    pub(crate) fn drop_row(&mut self, reason: &str) {
        *self.malformed.entry(reason.to_string()).or_insert(0) += 1;
    }

    /// Total rows dropped for any reason.
    pub fn dropped(&self) -> usize {
        self.malformed.values().sum()
    }
}

/// Parsed rows plus the drop counts and provenance for one input file.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub rows: Vec<T>,
    pub report: IngestReport,
    pub source: SourceMetadata,
}
