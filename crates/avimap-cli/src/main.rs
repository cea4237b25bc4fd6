//! Avimap CLI - gridded bird-occurrence surfaces.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.verbose),
        Commands::Match(args) => commands::match_cmd::run(args, cli.verbose),
        Commands::Model(args) => commands::model::run(args, cli.verbose),
        Commands::Simulate(args) => commands::simulate::run(args, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
