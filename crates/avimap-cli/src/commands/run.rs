//! Run command - the full pipeline against on-disk inputs.

use colored::Colorize;

use avimap::output::{
    write_bins_csv, write_coefficients_json, write_matched_csv, write_predictions_csv,
};
use avimap::{BoundingBox, Pipeline, PipelineConfig, PipelineInputs};

use crate::cli::RunArgs;
use crate::commands::load_land_cover;

pub fn run(args: RunArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig {
        radius_km: args.radius_km,
        temp_bin_width: args.temp_bin_width,
        snow_bin_width: args.snow_bin_width,
        grid_cell_size_degrees: args.cell_size,
        points_per_cell: args.points_per_cell,
        elastic_alpha: args.alpha,
        random_seed: args.seed,
        k_folds: args.k_folds,
        n_lambdas: args.n_lambdas,
    };
    let inputs = PipelineInputs {
        checklists: args.inputs.checklists,
        detections: args.inputs.detections,
        stations: args.inputs.stations,
        weather: args.inputs.weather,
        bounds: BoundingBox::new(
            args.bounds.min_lat,
            args.bounds.min_lon,
            args.bounds.max_lat,
            args.bounds.max_lon,
        ),
    };
    let land_cover = load_land_cover(&args.land_cover)?;

    println!(
        "{} {}",
        "Running pipeline over".cyan().bold(),
        inputs.checklists.display().to_string().white()
    );

    let artifacts = Pipeline::with_config(config).run(&inputs, land_cover.as_ref())?;

    if verbose {
        println!();
        println!("{}", "Sources:".yellow().bold());
        for source in &artifacts.sources {
            println!("  {:24} {} rows, {}", source.file, source.row_count, source.hash);
        }
        println!();
        println!("{}", "Zero-fill:".yellow().bold());
        println!(
            "  Incomplete checklists: {}",
            artifacts.zero_fill.incomplete_checklists
        );
        println!("  Orphan detections:     {}", artifacts.zero_fill.orphan_detections);
        println!("  Retained:              {}", artifacts.zero_fill.retained);
    }

    let summary = &artifacts.summary;
    println!();
    println!(
        "Matched {} of {} observations ({:.1}%)",
        summary.matched.to_string().white().bold(),
        summary.observations,
        summary.match_rate * 100.0
    );
    println!(
        "  Too far: {}  No data that day: {}",
        summary.unmatched_too_far.to_string().yellow(),
        summary.unmatched_no_data.to_string().yellow()
    );
    println!(
        "Presence rate {:.1}% across {} covariate bins",
        summary.presence_rate * 100.0,
        summary.bin_groups
    );
    println!(
        "Scoring model: {} over {} grid cells",
        summary.scoring_model.green().bold(),
        summary.grid_cells
    );

    std::fs::create_dir_all(&args.output)?;
    write_matched_csv(args.output.join("matched.csv"), &artifacts.matched)?;
    write_bins_csv(args.output.join("bins.csv"), &artifacts.bins)?;
    write_coefficients_json(args.output.join("coefficients.json"), &artifacts.models)?;
    write_predictions_csv(args.output.join("predictions.csv"), &artifacts.predictions)?;

    let summary_json = serde_json::json!({
        "summary": artifacts.summary,
        "ingest": artifacts.ingest,
        "zero_fill": artifacts.zero_fill,
        "sources": artifacts.sources,
    });
    std::fs::write(
        args.output.join("summary.json"),
        serde_json::to_string_pretty(&summary_json)?,
    )?;

    println!();
    println!(
        "{} {}",
        "Artifacts written to".green().bold(),
        args.output.display().to_string().white()
    );

    Ok(())
}
