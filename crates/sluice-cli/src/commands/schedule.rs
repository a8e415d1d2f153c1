//! Schedule command - recurring runs until Ctrl+C.

use colored::Colorize;
use sluice::Pipeline;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::PipelineArgs;
use crate::scheduler::{Cadence, Scheduler};

pub fn run(
    args: PipelineArgs,
    cadence: Cadence,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(&args)?;

    println!(
        "{} {} (Ctrl+C to stop)",
        "Scheduling runs".cyan().bold(),
        cadence.to_string().white()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let cancel = CancellationToken::new();

        let on_signal = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping after the current run");
                    on_signal.cancel();
                }
                Err(e) => warn!(error = %e, "Could not listen for Ctrl+C"),
            }
        });

        // Each run re-reads the config file.
        let job = move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let config = match super::load_config(&args) {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!(error = %e, "Config reload failed, using last good config");
                    config.clone()
                }
            };
            let summary = Pipeline::new(config).run()?;
            println!(
                "{} {} rows, {} unparseable timestamps",
                "Run complete:".green().bold(),
                summary.rows_out(),
                summary.timestamp_failures()
            );
            Ok(())
        };

        let runs = Scheduler::new(cadence).run(job, cancel).await;
        println!("{} after {} runs", "Stopped".yellow().bold(), runs);
    });

    Ok(())
}
