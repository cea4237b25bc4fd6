//! Integration tests for the avimap pipeline.

use std::fmt::Write as _;
use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use avimap::{
    AvimapError, BoundingBox, MatchStatus, Pipeline, PipelineConfig, PipelineInputs,
    UniformLandCover,
};

const CHECKLIST_HEADER: &str = "checklist_id,observer_id,date,start_time,duration_minutes,\
                                distance_km,protocol,observer_count,latitude,longitude,complete\n";
const WEATHER_HEADER: &str = "station_id,date,tmax,tmin,precipitation,snowfall,snow_depth\n";
const STATION_HEADER: &str = "station_id,latitude,longitude,elevation,region\n";

struct Fixture {
    _dir: TempDir,
    inputs: PipelineInputs,
}

fn write_fixture(
    checklists: &str,
    detections: &str,
    stations: &str,
    weather: &str,
    bounds: BoundingBox,
) -> Fixture {
    let dir = TempDir::new().unwrap();
    let write = |name: &str, content: &str| -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    };

    let inputs = PipelineInputs {
        checklists: write("checklists.csv", checklists),
        detections: write("detections.csv", detections),
        stations: write("stations.csv", stations),
        weather: write("weather.csv", weather),
        bounds,
    };
    Fixture { _dir: dir, inputs }
}

fn small_config() -> PipelineConfig {
    PipelineConfig {
        grid_cell_size_degrees: 0.25,
        points_per_cell: 20,
        random_seed: 42,
        ..PipelineConfig::default()
    }
}

/// A fixture big enough to fit all four models: many checklists spread
/// over dates with varying weather.
fn modeling_fixture() -> Fixture {
    let mut checklists = String::from(CHECKLIST_HEADER);
    let mut detections = String::from("checklist_id,count\n");
    let mut weather = String::from(WEATHER_HEADER);
    let stations = format!(
        "{STATION_HEADER}\
         S1,42.05,-76.05,200,NY\n\
         S2,42.45,-75.65,350,NY\n"
    );

    for day in 1..=20 {
        let tmax = 2.0 + day as f64 * 0.7;
        let tmin = tmax - 8.0 - (day % 3) as f64;
        let snow = if day % 4 == 0 { 12.0 } else { 0.0 };
        writeln!(
            weather,
            "S1,2023-01-{day:02},{tmax},{tmin},1.0,{snow},{}",
            snow * 2.0
        )
        .unwrap();
        writeln!(
            weather,
            "S2,2023-01-{day:02},{},{},0.5,{snow},{}",
            tmax - 2.0,
            tmin - 2.0,
            snow * 2.0
        )
        .unwrap();

        // Two checklists per day, one near each station.
        writeln!(
            checklists,
            "A{day},obs1,2023-01-{day:02},07:30:00,60,2.0,traveling,2,42.0{},-76.0,1",
            day % 10
        )
        .unwrap();
        writeln!(
            checklists,
            "B{day},obs2,2023-01-{day:02},09:00:00,45,0.0,stationary,1,42.4{},-75.7,1",
            day % 10
        )
        .unwrap();
        if day % 2 == 0 {
            writeln!(detections, "A{day},{}", 1 + day % 3).unwrap();
        }
    }

    write_fixture(
        &checklists,
        &detections,
        &stations,
        &weather,
        BoundingBox::new(41.8, -76.2, 42.6, -75.5),
    )
}

// =============================================================================
// Matching scenarios
// =============================================================================

#[test]
fn test_nearest_station_scenario() {
    // Three checklists on the same date at (42.0, -76.0): one detection of
    // count 2, two without. One station ~10 km away with a valid record,
    // one ~80 km away.
    let checklists = format!(
        "{CHECKLIST_HEADER}\
         L1,obs1,2023-01-15,07:30:00,60,2.0,traveling,2,42.0,-76.0,1\n\
         L2,obs2,2023-01-15,08:00:00,30,1.0,traveling,1,42.0,-76.0,1\n\
         L3,obs3,2023-01-15,09:00:00,45,0.0,stationary,1,42.0,-76.0,1\n"
    );
    let detections = "checklist_id,count\nL1,2\n";
    let stations = format!(
        "{STATION_HEADER}\
         NEAR,42.0,-76.121,150,NY\n\
         FAR,42.0,-75.03,200,NY\n"
    );
    let weather = format!(
        "{WEATHER_HEADER}\
         NEAR,2023-01-15,15.0,5.0,1.0,0.0,0.0\n\
         FAR,2023-01-15,14.0,4.0,1.0,0.0,0.0\n"
    );

    let fixture = write_fixture(
        &checklists,
        detections,
        &stations,
        &weather,
        BoundingBox::new(41.5, -76.5, 42.5, -75.5),
    );

    let pipeline = Pipeline::new();
    let checklists = avimap::input::read_checklists(&fixture.inputs.checklists).unwrap();
    let detections = avimap::input::read_detections(&fixture.inputs.detections).unwrap();
    let stations = avimap::input::read_stations(&fixture.inputs.stations).unwrap();
    let weather = avimap::input::read_daily_weather(&fixture.inputs.weather).unwrap();

    let (records, _) =
        avimap::ZeroFillEngine::new().reconcile(&checklists.rows, &detections.rows);
    assert_eq!(records.len(), 3);

    let index = avimap::StationIndex::new(stations.rows);
    let store = avimap::DailyWeatherStore::new(weather.rows);
    let matched = pipeline
        .match_and_enrich(&records, &index, &store, &UniformLandCover::new(41))
        .unwrap();

    // The detection checklist matched the 10 km station, not the 80 km one.
    assert_eq!(matched[0].status, MatchStatus::Matched);
    assert_eq!(matched[0].station_id.as_deref(), Some("NEAR"));
    let distance = matched[0].station_distance_km.unwrap();
    assert!((distance - 10.0).abs() < 0.5, "distance was {distance}");
    assert!(matched[0].record.presence);
    assert_eq!(matched[0].record.count, 2);

    // The co-located zero-filled checklists match the same station.
    for obs in &matched[1..] {
        assert_eq!(obs.status, MatchStatus::Matched);
        assert_eq!(obs.station_id.as_deref(), Some("NEAR"));
        assert!(!obs.record.presence);
        assert_eq!(obs.record.count, 0);
        assert_eq!(obs.tmax, Some(15.0));
        assert_eq!(obs.tmin, Some(5.0));
    }
}

#[test]
fn test_zero_duration_checklist_never_reaches_matching() {
    let checklists = format!(
        "{CHECKLIST_HEADER}\
         L1,obs1,2023-01-15,07:30:00,0,3.0,traveling,1,42.0,-76.0,1\n"
    );
    let fixture = write_fixture(
        &checklists,
        "checklist_id,count\n",
        &format!("{STATION_HEADER}S1,42.0,-76.1,100,NY\n"),
        &format!("{WEATHER_HEADER}S1,2023-01-15,15.0,5.0,1.0,0.0,0.0\n"),
        BoundingBox::new(41.5, -76.5, 42.5, -75.5),
    );

    let checklists = avimap::input::read_checklists(&fixture.inputs.checklists).unwrap();
    let (records, report) = avimap::ZeroFillEngine::new().reconcile(&checklists.rows, &[]);
    assert!(records.is_empty());
    assert_eq!(report.removed_speed, 1);
}

// =============================================================================
// Full pipeline
// =============================================================================

#[test]
fn test_full_run_produces_all_artifacts() {
    let fixture = modeling_fixture();
    let pipeline = Pipeline::with_config(small_config());
    let artifacts = pipeline
        .run(&fixture.inputs, &UniformLandCover::new(41))
        .unwrap();

    assert_eq!(artifacts.sources.len(), 4);
    assert_eq!(artifacts.summary.observations, 40);
    assert!(artifacts.summary.matched > 0);
    assert!(artifacts.summary.match_rate > 0.9);
    assert!(artifacts.summary.presence_rate > 0.0);

    // Bin ratios sum to one.
    let ratio_sum: f64 = artifacts.bins.groups.iter().map(|g| g.ratio).sum();
    assert_abs_diff_eq!(ratio_sum, 1.0, epsilon = 1e-9);

    // All four fits produced named coefficients for the fixed feature set.
    assert_eq!(artifacts.models.full.model.coefficients.len(), 8);
    assert_eq!(artifacts.models.lasso.model.coefficients.len(), 8);
    assert_eq!(artifacts.models.ridge.model.coefficients.len(), 8);
    assert_eq!(artifacts.models.elastic.model.coefficients.len(), 8);

    // One prediction per grid cell, ids sequential.
    assert!(!artifacts.predictions.is_empty());
    for (i, p) in artifacts.predictions.iter().enumerate() {
        assert_eq!(p.cell_id, i);
        assert_eq!(p.points, 20);
    }
}

#[test]
fn test_full_run_is_reproducible() {
    let fixture = modeling_fixture();
    let pipeline = Pipeline::with_config(small_config());

    let a = pipeline
        .run(&fixture.inputs, &UniformLandCover::new(41))
        .unwrap();
    let b = pipeline
        .run(&fixture.inputs, &UniformLandCover::new(41))
        .unwrap();

    // Bit-for-bit identical surface under the same seed.
    assert_eq!(a.predictions, b.predictions);
    assert_eq!(a.matched, b.matched);
}

#[test]
fn test_different_seed_changes_surface() {
    let fixture = modeling_fixture();
    let a = Pipeline::with_config(small_config())
        .run(&fixture.inputs, &UniformLandCover::new(41))
        .unwrap();
    let b = Pipeline::with_config(PipelineConfig {
        random_seed: 43,
        ..small_config()
    })
    .run(&fixture.inputs, &UniformLandCover::new(41))
    .unwrap();

    assert_ne!(a.predictions, b.predictions);
}

#[test]
fn test_missing_input_file_aborts() {
    let fixture = modeling_fixture();
    let mut inputs = fixture.inputs.clone();
    inputs.weather = PathBuf::from("/nonexistent/weather.csv");

    let result = Pipeline::with_config(small_config()).run(&inputs, &UniformLandCover::new(41));
    assert!(matches!(result, Err(AvimapError::MissingResource { .. })));
}

#[test]
fn test_insufficient_data_is_fatal_to_modeling() {
    // A single usable observation cannot support eight predictors.
    let checklists = format!(
        "{CHECKLIST_HEADER}\
         L1,obs1,2023-01-15,07:30:00,60,2.0,traveling,2,42.0,-76.0,1\n"
    );
    let fixture = write_fixture(
        &checklists,
        "checklist_id,count\nL1,1\n",
        &format!("{STATION_HEADER}S1,42.0,-76.1,100,NY\n"),
        &format!("{WEATHER_HEADER}S1,2023-01-15,15.0,5.0,1.0,0.0,0.0\n"),
        BoundingBox::new(41.5, -76.5, 42.5, -75.5),
    );

    let result =
        Pipeline::with_config(small_config()).run(&fixture.inputs, &UniformLandCover::new(41));
    assert!(matches!(
        result,
        Err(AvimapError::InsufficientData { .. })
    ));
}

// =============================================================================
// Artifact writers
// =============================================================================

#[test]
fn test_artifacts_persist_to_disk() {
    let fixture = modeling_fixture();
    let artifacts = Pipeline::with_config(small_config())
        .run(&fixture.inputs, &UniformLandCover::new(41))
        .unwrap();

    let out = TempDir::new().unwrap();
    avimap::output::write_matched_csv(out.path().join("matched.csv"), &artifacts.matched).unwrap();
    avimap::output::write_bins_csv(out.path().join("bins.csv"), &artifacts.bins).unwrap();
    avimap::output::write_coefficients_json(out.path().join("coefficients.json"), &artifacts.models)
        .unwrap();
    avimap::output::write_predictions_csv(out.path().join("predictions.csv"), &artifacts.predictions)
        .unwrap();

    let matched = std::fs::read_to_string(out.path().join("matched.csv")).unwrap();
    assert_eq!(matched.lines().count(), artifacts.matched.len() + 1);

    // The persisted matched table supports re-running modeling without
    // redoing the match.
    let reread = avimap::read_matched_csv(out.path().join("matched.csv")).unwrap();
    assert_eq!(reread.rows, artifacts.matched);

    let coefficients: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("coefficients.json")).unwrap())
            .unwrap();
    assert!(coefficients["full"]["tmax"].is_number());
    assert!(coefficients["drop_candidates"].is_array());
}
