//! Nearest-station weather matching for presence/absence observations.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::geo::haversine_km;
use crate::stations::StationIndex;
use crate::weather::{DailyWeatherRecord, DailyWeatherStore};
use crate::zerofill::PresenceAbsenceRecord;

/// Default station-match distance cutoff in kilometers.
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Outcome of matching one observation against the weather universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Nearest eligible station was within the radius; weather attached.
    Matched,
    /// Eligible stations existed that day, but the nearest was beyond the
    /// radius.
    TooFar,
    /// No station had an eligible record on the observation's date.
    NoDataThatDay,
}

impl MatchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::TooFar => "unmatched-too-far",
            MatchStatus::NoDataThatDay => "unmatched-no-data-that-day",
        }
    }

    /// Inverse of [`label`](Self::label), for re-reading persisted tables.
    pub fn parse_label(value: &str) -> Option<Self> {
        match value {
            "matched" => Some(MatchStatus::Matched),
            "unmatched-too-far" => Some(MatchStatus::TooFar),
            "unmatched-no-data-that-day" => Some(MatchStatus::NoDataThatDay),
            _ => None,
        }
    }
}

/// A presence/absence record augmented with the nearest eligible station's
/// weather. Unmatched records carry `None` weather fields and are excluded
/// from modeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedObservation {
    pub record: PresenceAbsenceRecord,
    pub status: MatchStatus,
    pub station_id: Option<String>,
    pub station_distance_km: Option<f64>,
    pub tmax: Option<f64>,
    pub tmin: Option<f64>,
    pub precipitation: Option<f64>,
    pub snowfall: Option<f64>,
    pub snow_depth: Option<f64>,
    pub avg_temp: Option<f64>,
    /// Land-cover class at the observation coordinate, attached by the
    /// pipeline from the raster point-query service.
    pub land_cover: Option<i64>,
}

impl MatchedObservation {
    fn unmatched(record: PresenceAbsenceRecord, status: MatchStatus) -> Self {
        Self {
            record,
            status,
            station_id: None,
            station_distance_km: None,
            tmax: None,
            tmin: None,
            precipitation: None,
            snowfall: None,
            snow_depth: None,
            avg_temp: None,
            land_cover: None,
        }
    }

    /// Whether every covariate the models need is present.
    pub fn has_complete_covariates(&self) -> bool {
        self.status == MatchStatus::Matched && self.land_cover.is_some()
    }
}

/// One date-eligible station candidate: the record plus its station
/// coordinate, resolved once per distinct date.
struct Candidate<'a> {
    record: &'a DailyWeatherRecord,
    lat: f64,
    lon: f64,
}

/// Matches each observation to the nearest station holding an eligible
/// weather record on the observation's calendar date, within a radius.
///
/// The station index and weather store are passed in explicitly; the
/// matcher holds no ambient state. Only stations with an eligible record on
/// the exact date are considered, which couples the two reference
/// structures per date rather than querying the index independently.
pub struct ObservationMatcher<'a> {
    stations: &'a StationIndex,
    weather: &'a DailyWeatherStore,
    radius_km: f64,
}

impl<'a> ObservationMatcher<'a> {
    pub fn new(stations: &'a StationIndex, weather: &'a DailyWeatherStore) -> Self {
        Self::with_radius(stations, weather, DEFAULT_RADIUS_KM)
    }

    pub fn with_radius(
        stations: &'a StationIndex,
        weather: &'a DailyWeatherStore,
        radius_km: f64,
    ) -> Self {
        Self {
            stations,
            weather,
            radius_km,
        }
    }

    /// Match a single observation. Ties on exactly equal minimum distance
    /// resolve to the first candidate in the store's per-date input order,
    /// keeping results reproducible.
    pub fn match_one(&self, record: &PresenceAbsenceRecord) -> MatchedObservation {
        let candidates = self.candidates_for(record.date);
        self.match_against(record, &candidates)
    }

    /// Match every observation, preserving input row order. Candidate
    /// coordinates are resolved once per distinct date so ineligible
    /// stations are never rescanned.
    pub fn match_all(&self, records: &[PresenceAbsenceRecord]) -> Vec<MatchedObservation> {
        let mut by_date: HashMap<NaiveDate, Vec<Candidate<'a>>> = HashMap::new();
        records
            .iter()
            .map(|record| {
                let candidates = by_date
                    .entry(record.date)
                    .or_insert_with(|| self.candidates_for(record.date));
                self.match_against(record, candidates)
            })
            .collect()
    }

    fn candidates_for(&self, date: NaiveDate) -> Vec<Candidate<'a>> {
        self.weather
            .records_on(date)
            .iter()
            .filter_map(|record| {
                let station = self.stations.get(&record.station_id)?;
                Some(Candidate {
                    record,
                    lat: station.latitude,
                    lon: station.longitude,
                })
            })
            .collect()
    }

    fn match_against(
        &self,
        record: &PresenceAbsenceRecord,
        candidates: &[Candidate<'a>],
    ) -> MatchedObservation {
        if candidates.is_empty() {
            return MatchedObservation::unmatched(record.clone(), MatchStatus::NoDataThatDay);
        }

        let mut best: Option<(&Candidate<'a>, f64)> = None;
        for candidate in candidates {
            let distance =
                haversine_km(record.latitude, record.longitude, candidate.lat, candidate.lon);
            // Strict comparison keeps the earliest candidate on exact ties.
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((candidate, distance)),
            }
        }

        let (candidate, distance) = best.expect("non-empty candidate set");
        if distance > self.radius_km {
            return MatchedObservation::unmatched(record.clone(), MatchStatus::TooFar);
        }

        let weather = candidate.record;
        MatchedObservation {
            record: record.clone(),
            status: MatchStatus::Matched,
            station_id: Some(weather.station_id.clone()),
            station_distance_km: Some(distance),
            tmax: weather.tmax,
            tmin: weather.tmin,
            precipitation: weather.precipitation,
            snowfall: weather.snowfall,
            snow_depth: weather.snow_depth,
            avg_temp: weather.avg_temp(),
            land_cover: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::WeatherStation;
    use crate::zerofill::Protocol;
    use chrono::{NaiveDate, NaiveTime};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn station(id: &str, lat: f64, lon: f64) -> WeatherStation {
        WeatherStation {
            id: id.to_string(),
            latitude: lat,
            longitude: lon,
            elevation: 100.0,
            region: "NY".to_string(),
        }
    }

    fn weather(station: &str, d: u32) -> DailyWeatherRecord {
        DailyWeatherRecord {
            station_id: station.to_string(),
            date: date(d),
            tmax: Some(15.0),
            tmin: Some(5.0),
            precipitation: Some(1.0),
            snowfall: Some(0.0),
            snow_depth: Some(0.0),
        }
    }

    fn observation(lat: f64, lon: f64, d: u32) -> PresenceAbsenceRecord {
        PresenceAbsenceRecord {
            checklist_id: "L1".to_string(),
            observer_id: "obs1".to_string(),
            date: date(d),
            latitude: lat,
            longitude: lon,
            presence: true,
            count: 2,
            protocol: Protocol::Traveling,
            observer_count: 1,
            time_of_day: 8.0,
            effort_hours: 1.0,
            distance_km: 2.0,
            speed_kmh: Some(2.0),
        }
    }

    #[test]
    fn test_nearest_station_wins() {
        // ~10 km east vs ~80 km east of the observation.
        let stations = StationIndex::new(vec![
            station("FAR", 42.0, -75.03),
            station("NEAR", 42.0, -76.121),
        ]);
        let store = DailyWeatherStore::new(vec![weather("FAR", 15), weather("NEAR", 15)]);
        let matcher = ObservationMatcher::new(&stations, &store);

        let matched = matcher.match_one(&observation(42.0, -76.0, 15));
        assert_eq!(matched.status, MatchStatus::Matched);
        assert_eq!(matched.station_id.as_deref(), Some("NEAR"));
        let distance = matched.station_distance_km.unwrap();
        assert!((distance - 10.0).abs() < 0.5, "distance was {distance}");
        assert_eq!(matched.tmax, Some(15.0));
        assert_eq!(matched.avg_temp, Some(10.0));
    }

    #[test]
    fn test_no_data_that_day() {
        let stations = StationIndex::new(vec![station("S1", 42.0, -76.1)]);
        let store = DailyWeatherStore::new(vec![weather("S1", 14)]);
        let matcher = ObservationMatcher::new(&stations, &store);

        let matched = matcher.match_one(&observation(42.0, -76.0, 15));
        assert_eq!(matched.status, MatchStatus::NoDataThatDay);
        assert!(matched.tmax.is_none());
    }

    #[test]
    fn test_too_far() {
        // ~80 km away with a 50 km cutoff.
        let stations = StationIndex::new(vec![station("FAR", 42.0, -75.03)]);
        let store = DailyWeatherStore::new(vec![weather("FAR", 15)]);
        let matcher = ObservationMatcher::new(&stations, &store);

        let matched = matcher.match_one(&observation(42.0, -76.0, 15));
        assert_eq!(matched.status, MatchStatus::TooFar);
        assert!(matched.station_distance_km.is_none());
    }

    #[test]
    fn test_tie_breaks_to_first_in_input_order() {
        let stations = StationIndex::new(vec![
            station("B", 42.5, -76.0),
            station("A", 42.5, -76.0),
        ]);
        // Store order decides: "B" was ingested first on the date.
        let store = DailyWeatherStore::new(vec![weather("B", 15), weather("A", 15)]);
        let matcher = ObservationMatcher::new(&stations, &store);

        let matched = matcher.match_one(&observation(42.0, -76.0, 15));
        assert_eq!(matched.station_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_match_all_deterministic_and_ordered() {
        let stations = StationIndex::new(vec![
            station("S1", 42.0, -76.1),
            station("S2", 42.4, -76.2),
        ]);
        let store = DailyWeatherStore::new(vec![weather("S1", 15), weather("S2", 15)]);
        let matcher = ObservationMatcher::new(&stations, &store);

        let records = vec![
            observation(42.0, -76.0, 15),
            observation(42.4, -76.0, 15),
            observation(42.2, -76.0, 16),
        ];
        let first = matcher.match_all(&records);
        let second = matcher.match_all(&records);
        assert_eq!(first, second);
        assert_eq!(first[0].station_id.as_deref(), Some("S1"));
        assert_eq!(first[1].station_id.as_deref(), Some("S2"));
        assert_eq!(first[2].status, MatchStatus::NoDataThatDay);
    }

    #[test]
    fn test_matched_distance_is_true_minimum() {
        let stations = StationIndex::new(vec![
            station("S1", 42.0, -76.2),
            station("S2", 42.0, -76.4),
            station("S3", 42.1, -76.05),
        ]);
        let store = DailyWeatherStore::new(vec![
            weather("S1", 15),
            weather("S2", 15),
            weather("S3", 15),
        ]);
        let matcher = ObservationMatcher::new(&stations, &store);

        let obs = observation(42.0, -76.0, 15);
        let matched = matcher.match_one(&obs);
        let reported = matched.station_distance_km.unwrap();

        let minimum = stations
            .nearest_stations(obs.latitude, obs.longitude)
            .first()
            .map(|(_, d)| *d)
            .unwrap();
        assert!((reported - minimum).abs() < 1e-12);
        assert!(reported <= DEFAULT_RADIUS_KM);
    }
}
