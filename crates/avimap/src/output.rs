//! Artifact writers: matched table, bin groups, coefficients, predictions.

use std::fs::File;
use std::path::Path;

use crate::binning::BinningResult;
use crate::error::{AvimapError, Result};
use crate::matching::MatchedObservation;
use crate::model::ModelComparison;
use crate::simulate::GridPrediction;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> AvimapError + '_ {
    move |e| AvimapError::Io {
        path: path.to_path_buf(),
        source: e,
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Persist the matched-observation table for reuse by modeling.
pub fn write_matched_csv(path: impl AsRef<Path>, matched: &[MatchedObservation]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(io_err(path))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(crate::input::MATCHED_COLUMNS)?;

    for obs in matched {
        let protocol = match obs.record.protocol {
            crate::zerofill::Protocol::Stationary => "stationary",
            crate::zerofill::Protocol::Traveling => "traveling",
            crate::zerofill::Protocol::Other => "other",
        };
        writer.write_record([
            obs.record.checklist_id.clone(),
            obs.record.observer_id.clone(),
            obs.record.date.to_string(),
            obs.record.latitude.to_string(),
            obs.record.longitude.to_string(),
            obs.record.presence.to_string(),
            obs.record.count.to_string(),
            protocol.to_string(),
            obs.record.observer_count.to_string(),
            obs.record.time_of_day.to_string(),
            obs.record.effort_hours.to_string(),
            obs.record.distance_km.to_string(),
            optional(obs.record.speed_kmh),
            obs.status.label().to_string(),
            obs.station_id.clone().unwrap_or_default(),
            optional(obs.station_distance_km),
            optional(obs.tmax),
            optional(obs.tmin),
            optional(obs.precipitation),
            optional(obs.snowfall),
            optional(obs.snow_depth),
            optional(obs.avg_temp),
            obs.land_cover.map(|c| c.to_string()).unwrap_or_default(),
        ])?;
    }

    writer.flush().map_err(io_err(path))?;
    Ok(())
}

/// Persist the binned-group table.
pub fn write_bins_csv(path: impl AsRef<Path>, bins: &BinningResult) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(io_err(path))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(["temp_bin", "snow_bin", "count", "ratio"])?;
    for group in &bins.groups {
        writer.write_record([
            group.temp_bin.to_string(),
            group.snow_bin.to_string(),
            group.count.to_string(),
            group.ratio.to_string(),
        ])?;
    }

    writer.flush().map_err(io_err(path))?;
    Ok(())
}

/// Persist all four fits' named coefficients plus the drop
/// recommendations as JSON.
pub fn write_coefficients_json(path: impl AsRef<Path>, models: &ModelComparison) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::json!({
        "full": models.full.model.coefficient_table(),
        "full_intercept": models.full.model.intercept,
        "lasso": models.lasso.model.coefficient_table(),
        "lasso_lambda": models.lasso.lambda,
        "ridge": models.ridge.model.coefficient_table(),
        "ridge_lambda": models.ridge.lambda,
        "elastic": models.elastic.model.coefficient_table(),
        "elastic_lambda": models.elastic.lambda,
        "drop_candidates": models.drop_candidates,
    });
    std::fs::write(path, serde_json::to_string_pretty(&json)?).map_err(io_err(path))?;
    Ok(())
}

/// Persist the per-cell prediction surface.
pub fn write_predictions_csv(path: impl AsRef<Path>, predictions: &[GridPrediction]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(io_err(path))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(["cell_id", "points", "sum", "mean"])?;
    for prediction in predictions {
        writer.write_record([
            prediction.cell_id.to_string(),
            prediction.points.to_string(),
            prediction.sum.to_string(),
            prediction.mean.to_string(),
        ])?;
    }

    writer.flush().map_err(io_err(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::BinnedGroup;
    use tempfile::tempdir;

    #[test]
    fn test_write_bins_round_trips_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bins.csv");
        let bins = BinningResult {
            temp_bin_width: 1.0,
            snow_bin_width: 5.0,
            temp_min: 2.3,
            snow_min: 0.0,
            total: 3,
            groups: vec![
                BinnedGroup {
                    temp_bin: 0,
                    snow_bin: 0,
                    count: 2,
                    ratio: 2.0 / 3.0,
                },
                BinnedGroup {
                    temp_bin: 1,
                    snow_bin: 0,
                    count: 1,
                    ratio: 1.0 / 3.0,
                },
            ],
        };

        write_bins_csv(&path, &bins).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("temp_bin,snow_bin,count,ratio\n"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_write_predictions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        let predictions = vec![GridPrediction {
            cell_id: 0,
            points: 10,
            sum: 1.5,
            mean: 0.15,
        }];

        write_predictions_csv(&path, &predictions).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("0,10,1.5,0.15"));
    }
}
