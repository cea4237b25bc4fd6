//! Weather-station reference data and nearest-neighbor queries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geo::haversine_km;

/// A weather station. Static reference data, loaded once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherStation {
    /// Station identifier (e.g. GHCND id).
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters.
    pub elevation: f64,
    /// Administrative region code (e.g. state abbreviation).
    pub region: String,
}

/// Holds station identities and coordinates; answers nearest-neighbor
/// queries by haversine distance.
#[derive(Debug, Clone, Default)]
pub struct StationIndex {
    stations: Vec<WeatherStation>,
    by_id: HashMap<String, usize>,
}

impl StationIndex {
    pub fn new(stations: Vec<WeatherStation>) -> Self {
        let by_id = stations
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self { stations, by_id }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Look up a station by identifier.
    pub fn get(&self, id: &str) -> Option<&WeatherStation> {
        self.by_id.get(id).map(|&i| &self.stations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeatherStation> {
        self.stations.iter()
    }

    /// All stations ordered ascending by great-circle distance from the
    /// target. The sort is stable: exactly equal distances keep input order.
    /// An empty index yields an empty sequence.
    pub fn nearest_stations(&self, lat: f64, lon: f64) -> Vec<(&WeatherStation, f64)> {
        let mut ranked: Vec<(&WeatherStation, f64)> = self
            .stations
            .iter()
            .map(|s| (s, haversine_km(lat, lon, s.latitude, s.longitude)))
            .collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}
