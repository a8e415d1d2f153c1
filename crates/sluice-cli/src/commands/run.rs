//! Run command - extract, clean and load once.

use colored::Colorize;
use sluice::Pipeline;
use tracing::debug;

use crate::cli::PipelineArgs;

pub fn run(args: PipelineArgs, _verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(&args)?;
    debug!(config = %args.config.display(), "Loaded config");

    let pipeline = Pipeline::new(config);
    let summary = pipeline.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Loaded into".cyan().bold(),
        summary.destination.as_deref().unwrap_or_default().white()
    );
    println!();
    super::print_summary(&summary);
    Ok(())
}
