//! Weather-station and daily-weather ingestion.

use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use super::checklist::column;
use super::source::{SourceMetadata, read_reference_file};
use super::{IngestReport, Ingested};
use crate::error::Result;
use crate::stations::WeatherStation;
use crate::weather::DailyWeatherRecord;

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

/// An optional measurement: empty or NA-like means absent; a non-empty
/// value that fails to parse is malformed.
fn optional_f64(value: &str) -> std::result::Result<Option<f64>, ()> {
    if value.is_empty() || value.eq_ignore_ascii_case("na") || value.eq_ignore_ascii_case("n/a") {
        return Ok(None);
    }
    value.parse::<f64>().map(Some).map_err(|_| ())
}

/// Read the station reference table.
pub fn read_stations(path: impl AsRef<Path>) -> Result<Ingested<WeatherStation>> {
    let path = path.as_ref();
    let contents = read_reference_file(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_slice());
    let headers = reader.headers()?.clone();

    let id = column(&headers, "station_id", path)?;
    let lat = column(&headers, "latitude", path)?;
    let lon = column(&headers, "longitude", path)?;
    let elevation = column(&headers, "elevation", path)?;
    let region = column(&headers, "region", path)?;

    let mut report = IngestReport::default();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        report.rows_read += 1;

        let (Ok(latitude), Ok(longitude), Ok(elevation_m)) = (
            field(&record, lat).parse::<f64>(),
            field(&record, lon).parse::<f64>(),
            field(&record, elevation).parse::<f64>(),
        ) else {
            report.drop_row("non-numeric station field");
            continue;
        };

        rows.push(WeatherStation {
            id: field(&record, id).to_string(),
            latitude,
            longitude,
            elevation: elevation_m,
            region: field(&record, region).to_string(),
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

/// Read the daily weather table. Missing measurements stay missing: they
/// are kept as `None` and decide matching eligibility later; only rows
/// with unparseable values are dropped.
pub fn read_daily_weather(path: impl AsRef<Path>) -> Result<Ingested<DailyWeatherRecord>> {
    let path = path.as_ref();
    let contents = read_reference_file(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_slice());
    let headers = reader.headers()?.clone();

    let id = column(&headers, "station_id", path)?;
    let date = column(&headers, "date", path)?;
    let tmax = column(&headers, "tmax", path)?;
    let tmin = column(&headers, "tmin", path)?;
    let prcp = column(&headers, "precipitation", path)?;
    let snow = column(&headers, "snowfall", path)?;
    let depth = column(&headers, "snow_depth", path)?;

    let mut report = IngestReport::default();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        report.rows_read += 1;

        let Ok(parsed_date) = NaiveDate::parse_from_str(field(&record, date), "%Y-%m-%d") else {
            report.drop_row("unparseable date");
            continue;
        };
        let (Ok(tmax_v), Ok(tmin_v), Ok(prcp_v), Ok(snow_v), Ok(depth_v)) = (
            optional_f64(field(&record, tmax)),
            optional_f64(field(&record, tmin)),
            optional_f64(field(&record, prcp)),
            optional_f64(field(&record, snow)),
            optional_f64(field(&record, depth)),
        ) else {
            report.drop_row("non-numeric measurement");
            continue;
        };

        rows.push(DailyWeatherRecord {
            station_id: field(&record, id).to_string(),
            date: parsed_date,
            tmax: tmax_v,
            tmin: tmin_v,
            precipitation: prcp_v,
            snowfall: snow_v,
            snow_depth: depth_v,
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
