//! Plan command - show the cleaning steps for each dataset.

use std::path::PathBuf;

use colored::Colorize;
use indexmap::IndexMap;
use sluice::{Dataset, PipelineConfig, TransformEngine};

pub fn run(
    config: Option<PathBuf>,
    json_output: bool,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cleaning = match &config {
        Some(path) => PipelineConfig::load(path)?.cleaning,
        None => Default::default(),
    };
    let engine = TransformEngine::with_config(cleaning);

    if json_output {
        let plans: IndexMap<&str, _> = Dataset::ALL
            .iter()
            .map(|d| (d.table_name(), engine.plan(*d)))
            .collect();
        let output = serde_json::json!({
            "timestamp_format": engine.config().timestamp_format.as_str(),
            "timestamp_policy": engine.config().timestamp_policy,
            "dedup_stage": engine.config().dedup_stage,
            "datasets": plans,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} timestamps as {}, unparseable -> {}",
        "Cleaning plan:".cyan().bold(),
        engine.config().timestamp_format.as_str().white(),
        engine.config().timestamp_policy.to_string().white()
    );
    println!();

    for dataset in Dataset::ALL {
        println!(
            "{} ({})",
            dataset.label().yellow().bold(),
            dataset.table_name()
        );
        for (i, step) in engine.plan(dataset).iter().enumerate() {
            println!("  {}. {}", i + 1, step.description());
        }
        println!();
    }
    Ok(())
}
