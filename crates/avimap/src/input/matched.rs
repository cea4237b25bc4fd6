//! Re-ingestion of a persisted matched-observation table, so modeling and
//! simulation can run from an earlier matching pass without redoing it.

use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use super::checklist::{column, parse_flag};
use super::source::{SourceMetadata, read_reference_file};
use super::{IngestReport, Ingested};
use crate::error::Result;
use crate::matching::{MatchStatus, MatchedObservation};
use crate::zerofill::{PresenceAbsenceRecord, Protocol};

/// Column order of the persisted matched table. The writer emits exactly
/// this header and the reader resolves against it by name.
pub const MATCHED_COLUMNS: [&str; 23] = [
    "checklist_id",
    "observer_id",
    "date",
    "latitude",
    "longitude",
    "presence",
    "count",
    "protocol",
    "observer_count",
    "time_of_day",
    "effort_hours",
    "distance_km",
    "speed_kmh",
    "status",
    "station_id",
    "station_distance_km",
    "tmax",
    "tmin",
    "precipitation",
    "snowfall",
    "snow_depth",
    "avg_temp",
    "land_cover",
];

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

/// Empty cell means the value was absent when the table was written;
/// anything else must parse.
fn optional_f64(value: &str) -> std::result::Result<Option<f64>, ()> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<f64>().map(Some).map_err(|_| ())
}

/// Read a matched-observation table previously written by the pipeline.
/// Rows failing type coercion are dropped and counted per reason.
pub fn read_matched_csv(path: impl AsRef<Path>) -> Result<Ingested<MatchedObservation>> {
    let path = path.as_ref();
    let contents = read_reference_file(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_slice());
    let headers = reader.headers()?.clone();

    let mut idx = [0usize; MATCHED_COLUMNS.len()];
    for (slot, name) in idx.iter_mut().zip(MATCHED_COLUMNS) {
        *slot = column(&headers, name, path)?;
    }
    let [
        checklist_id,
        observer_id,
        date,
        latitude,
        longitude,
        presence,
        count,
        protocol,
        observer_count,
        time_of_day,
        effort_hours,
        distance_km,
        speed_kmh,
        status,
        station_id,
        station_distance_km,
        tmax,
        tmin,
        precipitation,
        snowfall,
        snow_depth,
        avg_temp,
        land_cover,
    ] = idx;

    let mut report = IngestReport::default();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        report.rows_read += 1;

        let Ok(parsed_date) = NaiveDate::parse_from_str(field(&record, date), "%Y-%m-%d") else {
            report.drop_row("unparseable date");
            continue;
        };
        let (Ok(lat), Ok(lon)) = (
            field(&record, latitude).parse::<f64>(),
            field(&record, longitude).parse::<f64>(),
        ) else {
            report.drop_row("non-numeric coordinate");
            continue;
        };
        let Some(parsed_presence) = parse_flag(field(&record, presence)) else {
            report.drop_row("unparseable presence flag");
            continue;
        };
        let (Ok(parsed_count), Ok(parsed_observers)) = (
            field(&record, count).parse::<u32>(),
            field(&record, observer_count).parse::<u32>(),
        ) else {
            report.drop_row("non-numeric count");
            continue;
        };
        let (Ok(parsed_time), Ok(parsed_effort), Ok(parsed_distance)) = (
            field(&record, time_of_day).parse::<f64>(),
            field(&record, effort_hours).parse::<f64>(),
            field(&record, distance_km).parse::<f64>(),
        ) else {
            report.drop_row("non-numeric effort");
            continue;
        };
        let Some(parsed_status) = MatchStatus::parse_label(field(&record, status)) else {
            report.drop_row("unknown match status");
            continue;
        };
        let (
            Ok(parsed_speed),
            Ok(parsed_station_distance),
            Ok(parsed_tmax),
            Ok(parsed_tmin),
            Ok(parsed_prcp),
            Ok(parsed_snow),
            Ok(parsed_depth),
            Ok(parsed_avg),
        ) = (
            optional_f64(field(&record, speed_kmh)),
            optional_f64(field(&record, station_distance_km)),
            optional_f64(field(&record, tmax)),
            optional_f64(field(&record, tmin)),
            optional_f64(field(&record, precipitation)),
            optional_f64(field(&record, snowfall)),
            optional_f64(field(&record, snow_depth)),
            optional_f64(field(&record, avg_temp)),
        )
        else {
            report.drop_row("non-numeric measurement");
            continue;
        };
        let parsed_land_cover = match field(&record, land_cover) {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(class) => Some(class),
                Err(_) => {
                    report.drop_row("non-numeric land cover");
                    continue;
                }
            },
        };
        let parsed_station = match field(&record, station_id) {
            "" => None,
            id => Some(id.to_string()),
        };

        rows.push(MatchedObservation {
            record: PresenceAbsenceRecord {
                checklist_id: field(&record, checklist_id).to_string(),
                observer_id: field(&record, observer_id).to_string(),
                date: parsed_date,
                latitude: lat,
                longitude: lon,
                presence: parsed_presence,
                count: parsed_count,
                protocol: Protocol::parse(field(&record, protocol)),
                observer_count: parsed_observers,
                time_of_day: parsed_time,
                effort_hours: parsed_effort,
                distance_km: parsed_distance,
                speed_kmh: parsed_speed,
            },
            status: parsed_status,
            station_id: parsed_station,
            station_distance_km: parsed_station_distance,
            tmax: parsed_tmax,
            tmin: parsed_tmin,
            precipitation: parsed_prcp,
            snowfall: parsed_snow,
            snow_depth: parsed_depth,
            avg_temp: parsed_avg,
            land_cover: parsed_land_cover,
        });
    }

    report.rows_kept = rows.len();
    let source = SourceMetadata::new(path, &contents, rows.len());
    Ok(Ingested {
        rows,
        report,
        source,
    })
}
