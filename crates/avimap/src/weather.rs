//! Per-station, per-date weather records and point-in-time lookups.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One station-day of weather. Any field may be missing in the raw data;
/// missingness is kept explicit, never substituted with a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeatherRecord {
    pub station_id: String,
    pub date: NaiveDate,
    /// Daily maximum temperature, °C.
    pub tmax: Option<f64>,
    /// Daily minimum temperature, °C.
    pub tmin: Option<f64>,
    /// Precipitation, mm.
    pub precipitation: Option<f64>,
    /// Snowfall, mm.
    pub snowfall: Option<f64>,
    /// Snow depth, mm.
    pub snow_depth: Option<f64>,
}

impl DailyWeatherRecord {
    /// Derived average temperature; defined only when both tmax and tmin
    /// are present.
    pub fn avg_temp(&self) -> Option<f64> {
        match (self.tmax, self.tmin) {
            (Some(hi), Some(lo)) => Some((hi + lo) / 2.0),
            _ => None,
        }
    }

    /// Whether this record may participate in observation matching: all of
    /// {precipitation, snowfall, snow depth, average temperature} present.
    pub fn is_eligible(&self) -> bool {
        self.precipitation.is_some()
            && self.snowfall.is_some()
            && self.snow_depth.is_some()
            && self.avg_temp().is_some()
    }
}

/// Holds daily weather records indexed by calendar date. Only eligible
/// records are indexed; a station with no eligible record on a date is
/// invisible that day, even if adjacent days have data.
#[derive(Debug, Clone, Default)]
pub struct DailyWeatherStore {
    by_date: HashMap<NaiveDate, Vec<DailyWeatherRecord>>,
    total: usize,
    excluded: usize,
}

impl DailyWeatherStore {
    /// Build the store, indexing eligible records by date in input order.
    pub fn new(records: Vec<DailyWeatherRecord>) -> Self {
        let total = records.len();
        let mut by_date: HashMap<NaiveDate, Vec<DailyWeatherRecord>> = HashMap::new();
        let mut excluded = 0;
        for record in records {
            if record.is_eligible() {
                by_date.entry(record.date).or_default().push(record);
            } else {
                excluded += 1;
            }
        }
        Self {
            by_date,
            total,
            excluded,
        }
    }

    /// Eligible records for an exact calendar date, in input order. No
    /// temporal interpolation across days is performed.
    pub fn records_on(&self, date: NaiveDate) -> &[DailyWeatherRecord] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total records ingested, including ineligible ones.
    pub fn total_records(&self) -> usize {
        self.total
    }

    /// Records excluded from matching eligibility.
    pub fn excluded_records(&self) -> usize {
        self.excluded
    }
}
