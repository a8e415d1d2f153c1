//! CLI command implementations.

pub mod plan;
pub mod preview;
pub mod run;
pub mod schedule;

use colored::Colorize;
use sluice::{PipelineConfig, RunSummary, TimestampFormat};

use crate::cli::PipelineArgs;

/// Load the config file and apply command-line overrides.
pub(crate) fn load_config(args: &PipelineArgs) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    if !args.config.exists() {
        return Err(format!(
            "Config file not found: {}\nCreate one or pass --config <FILE>.",
            args.config.display()
        )
        .into());
    }

    let mut config = PipelineConfig::load(&args.config)?;
    if let Some(policy) = args.policy {
        config.cleaning.timestamp_policy = policy;
    }
    if let Some(format) = &args.timestamp_format {
        config.cleaning.timestamp_format = TimestampFormat::new(format)?;
    }
    if args.parallel {
        config.parallel = true;
    }
    Ok(config)
}

/// Human-readable per-dataset report of a run or preview.
pub(crate) fn print_summary(summary: &RunSummary) {
    for (table, result) in &summary.results {
        println!("{}", result.dataset.label().yellow().bold());
        if let Some(source) = summary.sources.get(table) {
            println!("  Source:     {} ({})", source.file.white(), source.format);
        }
        println!(
            "  Rows:       {} in, {} out",
            result.rows_in,
            result.rows_out.to_string().white().bold()
        );
        if result.duplicates_removed > 0 {
            println!("  Duplicates: {}", result.duplicates_removed.to_string().blue());
        }
        if result.values_imputed > 0 {
            println!("  Imputed:    {}", result.values_imputed.to_string().blue());
        }
        if result.values_lowercased > 0 {
            println!("  Lowercased: {}", result.values_lowercased.to_string().blue());
        }
        if result.timestamp_failures > 0 {
            println!(
                "  Timestamps: {} unparseable, {} rows dropped",
                result.timestamp_failures.to_string().red(),
                result.rows_dropped
            );
            for audit in result.timestamp_audits().take(5) {
                let key = audit.key.as_deref().unwrap_or("-");
                println!(
                    "    {} row {}: {}",
                    key.dimmed(),
                    audit.row,
                    format!("{:?}", audit.original_value).dimmed()
                );
            }
        }
        println!();
    }

    let elapsed = summary.finished_at - summary.started_at;
    println!(
        "{} {} rows across {} datasets in {}ms",
        "Total:".cyan().bold(),
        summary.rows_out().to_string().white().bold(),
        summary.results.len(),
        elapsed.num_milliseconds()
    );
    if summary.timestamp_failures() > 0 {
        println!(
            "{} {} unparseable timestamps",
            "Warning:".yellow().bold(),
            summary.timestamp_failures()
        );
    }
}
