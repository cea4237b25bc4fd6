//! Zero-filling: reconciling complete checklists against the detection set
//! into a presence/absence table with effort-derived covariates.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Checklist protocol type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Stationary,
    Traveling,
    Other,
}

impl Protocol {
    /// Parse the protocol column, case-insensitively. Unrecognized values
    /// map to `Other` rather than failing the row.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "stationary" => Protocol::Stationary,
            "traveling" | "travelling" => Protocol::Traveling,
            _ => Protocol::Other,
        }
    }
}

/// A single birding outing report with effort metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: String,
    pub observer_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Outing duration in minutes.
    pub duration_minutes: f64,
    /// Distance traveled in kilometers, as reported.
    pub distance_km: f64,
    pub protocol: Protocol,
    pub observer_count: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Whether the observer reported all species identified. Only complete
    /// checklists support absence inference.
    pub complete: bool,
}

/// A species detection on one checklist. Counts that fail to parse as a
/// non-negative integer are dropped at ingestion, never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub checklist_id: String,
    pub count: u32,
}

/// One row per retained checklist: the species' presence/absence plus
/// effort-derived covariates. Created once per pipeline run, immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceAbsenceRecord {
    pub checklist_id: String,
    pub observer_id: String,
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub presence: bool,
    pub count: u32,
    pub protocol: Protocol,
    pub observer_count: u32,
    /// Hours since midnight as a real number in [0, 24).
    pub time_of_day: f64,
    /// Outing duration in hours.
    pub effort_hours: f64,
    /// Distance traveled in km; forced to 0 for stationary protocol.
    pub distance_km: f64,
    /// Distance per duration; `None` when duration is zero.
    pub speed_kmh: Option<f64>,
}

/// Effort-plausibility policy constants. Fixed policy, not configurable.
pub const MAX_EFFORT_HOURS: f64 = 6.0;
pub const MAX_DISTANCE_KM: f64 = 10.0;
pub const MAX_SPEED_KMH: f64 = 100.0;
pub const MAX_OBSERVER_COUNT: u32 = 10;

/// Counts of rows removed during reconciliation, by reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZeroFillReport {
    /// Checklists skipped because the completeness flag was false.
    pub incomplete_checklists: usize,
    /// Detections whose checklist id matched no eligible checklist.
    pub orphan_detections: usize,
    pub removed_protocol: usize,
    pub removed_duration: usize,
    pub removed_distance: usize,
    pub removed_speed: usize,
    pub removed_observers: usize,
    /// Rows surviving the effort-plausibility filter.
    pub retained: usize,
}

/// Reconciles the checklist set and the detection set into a complete
/// presence/absence table.
#[derive(Debug, Clone, Default)]
pub struct ZeroFillEngine;

impl ZeroFillEngine {
    pub fn new() -> Self {
        Self
    }

    /// Produce one presence/absence record per eligible checklist, in
    /// checklist input order, then apply the effort-plausibility filter.
    pub fn reconcile(
        &self,
        checklists: &[Checklist],
        detections: &[Detection],
    ) -> (Vec<PresenceAbsenceRecord>, ZeroFillReport) {
        let mut report = ZeroFillReport::default();

        let eligible: Vec<&Checklist> = checklists
            .iter()
            .filter(|c| {
                if c.complete {
                    true
                } else {
                    report.incomplete_checklists += 1;
                    false
                }
            })
            .collect();

        let eligible_ids: HashSet<&str> =
            eligible.iter().map(|c| c.id.as_str()).collect();

        // First detection per checklist wins; orphans are counted.
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for detection in detections {
            if !eligible_ids.contains(detection.checklist_id.as_str()) {
                report.orphan_detections += 1;
                continue;
            }
            counts
                .entry(detection.checklist_id.as_str())
                .or_insert(detection.count);
        }

        let mut records = Vec::with_capacity(eligible.len());
        for checklist in eligible {
            let derived = derive_record(checklist, counts.get(checklist.id.as_str()).copied());
            if self.passes_effort_filter(&derived, &mut report) {
                records.push(derived);
            }
        }

        report.retained = records.len();
        (records, report)
    }

    /// Effort-plausibility rules, applied after covariate derivation.
    fn passes_effort_filter(
        &self,
        record: &PresenceAbsenceRecord,
        report: &mut ZeroFillReport,
    ) -> bool {
        if record.protocol == Protocol::Other {
            report.removed_protocol += 1;
            return false;
        }
        if record.effort_hours > MAX_EFFORT_HOURS {
            report.removed_duration += 1;
            return false;
        }
        if record.distance_km > MAX_DISTANCE_KM {
            report.removed_distance += 1;
            return false;
        }
        // Undefined speed (zero duration) fails the speed rule outright; it
        // must not propagate downstream as infinity.
        match record.speed_kmh {
            None => {
                report.removed_speed += 1;
                return false;
            }
            Some(speed) if speed > MAX_SPEED_KMH => {
                report.removed_speed += 1;
                return false;
            }
            Some(_) => {}
        }
        if record.observer_count > MAX_OBSERVER_COUNT {
            report.removed_observers += 1;
            return false;
        }
        true
    }
}

/// Derive the presence/absence row for one checklist.
fn derive_record(checklist: &Checklist, count: Option<u32>) -> PresenceAbsenceRecord {
    // Stationary outings cover no ground regardless of what was reported.
    let distance_km = match checklist.protocol {
        Protocol::Stationary => 0.0,
        _ => checklist.distance_km,
    };
    let effort_hours = checklist.duration_minutes / 60.0;
    let speed_kmh = if effort_hours > 0.0 {
        Some(distance_km / effort_hours)
    } else {
        None
    };

    PresenceAbsenceRecord {
        checklist_id: checklist.id.clone(),
        observer_id: checklist.observer_id.clone(),
        date: checklist.date,
        latitude: checklist.latitude,
        longitude: checklist.longitude,
        presence: count.is_some(),
        count: count.unwrap_or(0),
        protocol: checklist.protocol.clone(),
        observer_count: checklist.observer_count,
        time_of_day: decimal_hours(checklist.start_time),
        effort_hours,
        distance_km,
        speed_kmh,
    }
}

/// Hours since midnight as a real number in [0, 24).
fn decimal_hours(time: NaiveTime) -> f64 {
    time.hour() as f64 + time.minute() as f64 / 60.0 + time.second() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checklist(id: &str, complete: bool) -> Checklist {
        Checklist {
            id: id.to_string(),
            observer_id: "obs1".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
            start_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
            duration_minutes: 60.0,
            distance_km: 2.0,
            protocol: Protocol::Traveling,
            observer_count: 2,
            latitude: 42.0,
            longitude: -76.0,
            complete,
        }
    }

    fn engine() -> ZeroFillEngine {
        ZeroFillEngine::new()
    }

    #[test]
    fn test_absence_synthesized_for_undetected() {
        let checklists = vec![checklist("L1", true), checklist("L2", true)];
        let detections = vec![Detection {
            checklist_id: "L1".to_string(),
            count: 3,
        }];

        let (records, report) = engine().reconcile(&checklists, &detections);
        assert_eq!(records.len(), 2);
        assert!(records[0].presence);
        assert_eq!(records[0].count, 3);
        assert!(!records[1].presence);
        assert_eq!(records[1].count, 0);
        assert_eq!(report.retained, 2);
    }

    #[test]
    fn test_incomplete_checklist_excluded() {
        let checklists = vec![checklist("L1", false)];
        let (records, report) = engine().reconcile(&checklists, &[]);
        assert!(records.is_empty());
        assert_eq!(report.incomplete_checklists, 1);
    }

    #[test]
    fn test_orphan_detection_counted() {
        let checklists = vec![checklist("L1", true)];
        let detections = vec![Detection {
            checklist_id: "MISSING".to_string(),
            count: 1,
        }];
        let (records, report) = engine().reconcile(&checklists, &detections);
        assert_eq!(records.len(), 1);
        assert!(!records[0].presence);
        assert_eq!(report.orphan_detections, 1);
    }

    #[test]
    fn test_stationary_distance_forced_zero() {
        let mut c = checklist("L1", true);
        c.protocol = Protocol::Stationary;
        c.distance_km = 5.0;
        let (records, _) = engine().reconcile(&[c], &[]);
        assert_eq!(records[0].distance_km, 0.0);
        assert_eq!(records[0].speed_kmh, Some(0.0));
    }

    #[test]
    fn test_zero_duration_excluded_not_infinite() {
        let mut c = checklist("L1", true);
        c.duration_minutes = 0.0;
        c.distance_km = 3.0;
        let (records, report) = engine().reconcile(&[c], &[]);
        assert!(records.is_empty());
        assert_eq!(report.removed_speed, 1);
    }

    #[test]
    fn test_effort_thresholds() {
        let mut too_long = checklist("L1", true);
        too_long.duration_minutes = 6.0 * 60.0 + 1.0;
        let mut too_far = checklist("L2", true);
        too_far.distance_km = 10.5;
        let mut too_fast = checklist("L3", true);
        too_fast.duration_minutes = 1.0;
        too_fast.distance_km = 2.0; // 120 km/h
        let mut crowd = checklist("L4", true);
        crowd.observer_count = 11;
        let mut other = checklist("L5", true);
        other.protocol = Protocol::Other;

        let (records, report) =
            engine().reconcile(&[too_long, too_far, too_fast, crowd, other], &[]);
        assert!(records.is_empty());
        assert_eq!(report.removed_duration, 1);
        assert_eq!(report.removed_distance, 1);
        assert_eq!(report.removed_speed, 1);
        assert_eq!(report.removed_observers, 1);
        assert_eq!(report.removed_protocol, 1);
    }

    #[test]
    fn test_time_of_day_decimal() {
        let (records, _) = engine().reconcile(&[checklist("L1", true)], &[]);
        approx::assert_abs_diff_eq!(records[0].time_of_day, 7.5, epsilon = 1e-12);
    }
}
