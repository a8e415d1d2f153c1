//! Example: clean one raw extract and print what changed.
//!
//! Usage:
//!   cargo run --example clean -- <dataset> <file_path> [timestamp_format]
//!
//! Example:
//!   cargo run --example clean -- branch_sales raw/branch_sales.csv MM/DD/YYYY

use std::env;

use sluice::{CleaningConfig, Dataset, Parser, TimestampFormat, TransformEngine};

fn main() -> sluice::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: cargo run --example clean -- <dataset> <file_path> [timestamp_format]");
        std::process::exit(1);
    }

    let dataset: Dataset = match args[1].parse() {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = CleaningConfig::default();
    if let Some(format) = args.get(3) {
        config = config.with_timestamp_format(TimestampFormat::new(format)?);
    }

    let (raw, source) = Parser::new().parse_dataset(dataset, &args[2])?;
    println!("{} ({} rows, {})", source.file, source.row_count, source.hash);

    let cleaned = TransformEngine::with_config(config).clean(dataset, raw)?;
    for change in &cleaned.result.changes {
        println!(
            "  {:<40} {:>6} changed {:>6} removed",
            change.description, change.values_changed, change.rows_removed
        );
    }

    for audit in cleaned.result.timestamp_audits().take(10) {
        println!(
            "  row {} [{}]: {}",
            audit.row,
            audit.key.as_deref().unwrap_or("-"),
            audit.reason
        );
    }

    println!(
        "{} rows in, {} rows out",
        cleaned.result.rows_in, cleaned.result.rows_out
    );
    Ok(())
}
