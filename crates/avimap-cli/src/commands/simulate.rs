//! Simulate command - predicted-occurrence surface from a matched table.
//!
//! Refits the models from the matched table, then simulates with the best
//! penalized fit, same as a full run.

use colored::Colorize;

use avimap::output::write_predictions_csv;
use avimap::{BoundingBox, Pipeline, PipelineConfig, read_matched_csv, scoring_model};

use crate::cli::SimulateArgs;
use crate::commands::load_land_cover;

pub fn run(args: SimulateArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let land_cover = load_land_cover(&args.land_cover)?;
    let bounds = BoundingBox::new(
        args.bounds.min_lat,
        args.bounds.min_lon,
        args.bounds.max_lat,
        args.bounds.max_lon,
    );

    println!(
        "{} {}",
        "Simulating from".cyan().bold(),
        args.matched.display().to_string().white()
    );

    let matched = read_matched_csv(&args.matched)?;

    let config = PipelineConfig {
        temp_bin_width: args.temp_bin_width,
        snow_bin_width: args.snow_bin_width,
        grid_cell_size_degrees: args.cell_size,
        points_per_cell: args.points_per_cell,
        elastic_alpha: args.alpha,
        random_seed: args.seed,
        k_folds: args.k_folds,
        n_lambdas: args.n_lambdas,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::with_config(config);

    let (_, models) = pipeline.fit_models(&matched.rows)?;
    let (name, model) = scoring_model(&models);
    println!("Scoring with the {} fit", name.green().bold());

    let predictions = pipeline.simulate(&matched.rows, &model, bounds, land_cover.as_ref())?;

    if verbose {
        let mean: f64 =
            predictions.iter().map(|p| p.mean).sum::<f64>() / predictions.len().max(1) as f64;
        println!(
            "  {} cells, grand mean {:.6}",
            predictions.len(),
            mean
        );
    }

    write_predictions_csv(&args.output, &predictions)?;
    println!(
        "{} {} ({} cells)",
        "Saved to".green().bold(),
        args.output.display().to_string().white(),
        predictions.len()
    );

    Ok(())
}
