//! Checklist and detection ingestion.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use csv::StringRecord;

use super::source::{SourceMetadata, read_reference_file};
use super::{IngestReport, Ingested};
use crate::error::{AvimapError, Result};
use crate::zerofill::{Checklist, Detection, Protocol};

/// Resolve a required column or fail the whole file.
pub(super) fn column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            AvimapError::Config(format!("missing column '{name}' in '{}'", path.display()))
        })
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

/// Read the checklist table. Rows failing type coercion are dropped and
/// counted per reason.
pub fn read_checklists(path: impl AsRef<Path>) -> Result<Ingested<Checklist>> {
    let path = path.as_ref();
    let contents = read_reference_file(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_slice());
    let headers = reader.headers()?.clone();

    let id = column(&headers, "checklist_id", path)?;
    let observer = column(&headers, "observer_id", path)?;
    let date = column(&headers, "date", path)?;
    let time = column(&headers, "start_time", path)?;
    let duration = column(&headers, "duration_minutes", path)?;
    let distance = column(&headers, "distance_km", path)?;
    let protocol = column(&headers, "protocol", path)?;
    let observers = column(&headers, "observer_count", path)?;
    let lat = column(&headers, "latitude", path)?;
    let lon = column(&headers, "longitude", path)?;
    let complete = column(&headers, "complete", path)?;

    let mut report = IngestReport::default();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        report.rows_read += 1;

        let Ok(parsed_date) = NaiveDate::parse_from_str(field(&record, date), "%Y-%m-%d") else {
            report.drop_row("unparseable date");
            continue;
        };
        let Ok(parsed_time) = NaiveTime::parse_from_str(field(&record, time), "%H:%M:%S") else {
            report.drop_row("unparseable start time");
            continue;
        };
        let (Ok(duration_minutes), Ok(distance_km)) = (
            field(&record, duration).parse::<f64>(),
            field(&record, distance).parse::<f64>(),
        ) else {
            report.drop_row("non-numeric effort");
            continue;
        };
        let (Ok(latitude), Ok(longitude)) = (
            field(&record, lat).parse::<f64>(),
            field(&record, lon).parse::<f64>(),
        ) else {
            report.drop_row("non-numeric coordinate");
            continue;
        };
        let Ok(observer_count) = field(&record, observers).parse::<u32>() else {
            report.drop_row("non-numeric observer count");
            continue;
        };
        let Some(is_complete) = parse_flag(field(&record, complete)) else {
            report.drop_row("unparseable completeness flag");
            continue;
        };

        rows.push(Checklist {
            id: field(&record, id).to_string(),
            observer_id: field(&record, observer).to_string(),
            date: parsed_date,
            start_time: parsed_time,
            duration_minutes,
            distance_km,
            protocol: Protocol::parse(field(&record, protocol)),
            observer_count,
            latitude,
            longitude,
            complete: is_complete,
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

/// Read the detection table. A count that does not parse as a non-negative
/// integer (e.g. the "present, count unknown" sentinel) drops the row; it
/// is never coerced to zero.
pub fn read_detections(path: impl AsRef<Path>) -> Result<Ingested<Detection>> {
    let path = path.as_ref();
    let contents = read_reference_file(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_slice());
    let headers = reader.headers()?.clone();

    let id = column(&headers, "checklist_id", path)?;
    let count = column(&headers, "count", path)?;

    let mut report = IngestReport::default();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        report.rows_read += 1;

        let Ok(parsed_count) = field(&record, count).parse::<u32>() else {
            report.drop_row("non-numeric count");
            continue;
        };
        rows.push(Detection {
            checklist_id: field(&record, id).to_string(),
            count: parsed_count,
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

/// Boolean flag column: accepts 1/0, true/false, yes/no.
pub(super) fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "n" | "f" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const CHECKLIST_HEADER: &str = "checklist_id,observer_id,date,start_time,duration_minutes,\
                                    distance_km,protocol,observer_count,latitude,longitude,complete\n";

    #[test]
    fn test_read_checklists() {
        let content = format!(
            "{CHECKLIST_HEADER}\
             L1,obs1,2023-01-15,07:30:00,60,2.0,traveling,2,42.0,-76.0,1\n\
             L2,obs2,2023-01-15,08:00:00,30,0,stationary,1,42.1,-76.1,0\n"
        );
        let file = create_test_file(&content);
        let ingested = read_checklists(file.path()).unwrap();

        assert_eq!(ingested.rows.len(), 2);
        assert_eq!(ingested.rows[0].id, "L1");
        assert_eq!(ingested.rows[0].protocol, Protocol::Traveling);
        assert!(ingested.rows[0].complete);
        assert!(!ingested.rows[1].complete);
        assert!(ingested.source.hash.starts_with("sha256:"));
    }

    #[test]
    fn test_malformed_rows_counted_not_fatal() {
        let content = format!(
            "{CHECKLIST_HEADER}\
             L1,obs1,2023-01-15,07:30:00,60,2.0,traveling,2,42.0,-76.0,1\n\
             L2,obs1,not-a-date,07:30:00,60,2.0,traveling,2,42.0,-76.0,1\n\
             L3,obs1,2023-01-15,late,60,2.0,traveling,2,42.0,-76.0,1\n"
        );
        let file = create_test_file(&content);
        let ingested = read_checklists(file.path()).unwrap();

        assert_eq!(ingested.rows.len(), 1);
        assert_eq!(ingested.report.rows_read, 3);
        assert_eq!(ingested.report.dropped(), 2);
        assert_eq!(ingested.report.malformed["unparseable date"], 1);
        assert_eq!(ingested.report.malformed["unparseable start time"], 1);
    }

    #[test]
    fn test_detection_sentinel_dropped_not_zeroed() {
        let content = "checklist_id,count\nL1,2\nL2,X\nL3,0\n";
        let file = create_test_file(content);
        let ingested = read_detections(file.path()).unwrap();

        assert_eq!(ingested.rows.len(), 2);
        assert_eq!(ingested.rows[0].count, 2);
        assert_eq!(ingested.rows[1].count, 0);
        assert_eq!(ingested.report.malformed["non-numeric count"], 1);
    }

    #[test]
    fn test_missing_file_is_missing_resource() {
        let result = read_checklists("/nonexistent/checklists.csv");
        assert!(matches!(
            result,
            Err(AvimapError::MissingResource { .. })
        ));
    }

    #[test]
    fn test_missing_column_fails_file() {
        let content = "checklist_id,observer_id\nL1,obs1\n";
        let file = create_test_file(content);
        assert!(matches!(
            read_checklists(file.path()),
            Err(AvimapError::Config(_))
        ));
    }
}
