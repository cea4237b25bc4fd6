//! Match command - zero-fill and station-match without modeling.

use colored::Colorize;

use avimap::input::{read_checklists, read_daily_weather, read_detections, read_stations};
use avimap::output::write_matched_csv;
use avimap::{
    DailyWeatherStore, MatchStatus, Pipeline, PipelineConfig, StationIndex, ZeroFillEngine,
};

use crate::cli::MatchArgs;
use crate::commands::load_land_cover;

pub fn run(args: MatchArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let land_cover = load_land_cover(&args.land_cover)?;

    println!(
        "{} {}",
        "Matching".cyan().bold(),
        args.inputs.checklists.display().to_string().white()
    );

    let checklists = read_checklists(&args.inputs.checklists)?;
    let detections = read_detections(&args.inputs.detections)?;
    let stations = read_stations(&args.inputs.stations)?;
    let weather = read_daily_weather(&args.inputs.weather)?;

    if verbose {
        for (name, report) in [
            ("checklists", &checklists.report),
            ("detections", &detections.report),
            ("stations", &stations.report),
            ("weather", &weather.report),
        ] {
            println!(
                "  {:12} {} rows read, {} dropped",
                name,
                report.rows_read,
                report.dropped()
            );
        }
    }

    let (records, zero_fill) = ZeroFillEngine::new().reconcile(&checklists.rows, &detections.rows);
    println!(
        "Zero-filled {} presence/absence records ({} checklists incomplete)",
        records.len().to_string().white().bold(),
        zero_fill.incomplete_checklists
    );

    let config = PipelineConfig {
        radius_km: args.radius_km,
        ..PipelineConfig::default()
    };
    let station_index = StationIndex::new(stations.rows);
    let weather_store = DailyWeatherStore::new(weather.rows);
    let matched = Pipeline::with_config(config).match_and_enrich(
        &records,
        &station_index,
        &weather_store,
        land_cover.as_ref(),
    )?;

    let matched_count = matched
        .iter()
        .filter(|m| m.status == MatchStatus::Matched)
        .count();
    println!(
        "Matched {} of {} observations",
        matched_count.to_string().white().bold(),
        matched.len()
    );

    write_matched_csv(&args.output, &matched)?;
    println!(
        "{} {}",
        "Saved to".green().bold(),
        args.output.display().to_string().white()
    );

    Ok(())
}
