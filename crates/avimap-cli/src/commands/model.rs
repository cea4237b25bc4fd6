//! Model command - fit and compare occurrence models from a matched table.

use colored::Colorize;

use avimap::output::{write_bins_csv, write_coefficients_json};
use avimap::{Pipeline, PipelineConfig, read_matched_csv, scoring_model};

use crate::cli::ModelArgs;

pub fn run(args: ModelArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{} {}",
        "Modeling".cyan().bold(),
        args.matched.display().to_string().white()
    );

    let matched = read_matched_csv(&args.matched)?;
    if matched.report.dropped() > 0 {
        println!(
            "  {} rows dropped on re-read",
            matched.report.dropped().to_string().yellow()
        );
    }

    let config = PipelineConfig {
        temp_bin_width: args.temp_bin_width,
        snow_bin_width: args.snow_bin_width,
        elastic_alpha: args.alpha,
        k_folds: args.k_folds,
        n_lambdas: args.n_lambdas,
        ..PipelineConfig::default()
    };
    let (bins, models) = Pipeline::with_config(config).fit_models(&matched.rows)?;

    println!(
        "Binned {} observations into {} groups",
        bins.total.to_string().white().bold(),
        bins.groups.len()
    );

    if verbose {
        println!();
        println!("{}", "Full model coefficients:".yellow().bold());
        for (name, coef) in models.full.model.coefficient_table() {
            println!("  {:16} {:>12.6}", name, coef);
        }
        println!();
    }

    println!(
        "Held-out MSE: lasso {:.6} (λ={:.4})  ridge {:.6} (λ={:.4})  elastic {:.6} (λ={:.4})",
        models.lasso.cv_mse,
        models.lasso.lambda,
        models.ridge.cv_mse,
        models.ridge.lambda,
        models.elastic.cv_mse,
        models.elastic.lambda
    );
    let (best, _) = scoring_model(&models);
    println!("Best penalized fit: {}", best.green().bold());

    if models.drop_candidates.is_empty() {
        println!("{}", "No predictors recommended for removal".green());
    } else {
        println!(
            "Predictors recommended for removal: {}",
            models.drop_candidates.join(", ").yellow()
        );
    }

    std::fs::create_dir_all(&args.output)?;
    write_bins_csv(args.output.join("bins.csv"), &bins)?;
    write_coefficients_json(args.output.join("coefficients.json"), &models)?;
    println!(
        "{} {}",
        "Artifacts written to".green().bold(),
        args.output.display().to_string().white()
    );

    Ok(())
}
