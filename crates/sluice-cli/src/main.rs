//! Sluice CLI - retail ETL pipeline runner.

mod cli;
mod commands;
mod logging;
mod scheduler;

use clap::Parser;
use cli::{Cli, Commands};
use logging::{LogConfig, init_logging};

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbose(cli.verbose)
        .with_format(cli.log_format)
        .with_log_file(cli.log_file.clone());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Run { args } => commands::run::run(args, cli.verbose),

        Commands::Preview { args, rows } => commands::preview::run(args, rows, cli.verbose),

        Commands::Plan { config, json } => commands::plan::run(config, json, cli.verbose),

        Commands::Schedule { args, at, every } => match at.or(every) {
            Some(cadence) => commands::schedule::run(args, cadence, cli.verbose),
            None => Err("Pass --at or --every".into()),
        },
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
