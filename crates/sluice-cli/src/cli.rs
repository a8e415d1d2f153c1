//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sluice::{DEFAULT_CONFIG_FILE, TimestampPolicy};

use crate::logging::LogFormat;
use crate::scheduler::Cadence;

/// Sluice: clean and load retail sales, customer and inventory extracts
#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format (pretty, compact, json)
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract, clean and load all four datasets once
    Run {
        #[command(flatten)]
        args: PipelineArgs,
    },

    /// Extract and clean without loading, then show what would be written
    Preview {
        #[command(flatten)]
        args: PipelineArgs,

        /// Number of cleaned rows to print per dataset
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,
    },

    /// Show the cleaning steps applied to each dataset
    Plan {
        /// Path to config file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the pipeline on a recurring schedule until interrupted
    Schedule {
        #[command(flatten)]
        args: PipelineArgs,

        /// Run daily at this local time (HH:MM)
        #[arg(long, value_name = "HH:MM", value_parser = Cadence::parse_daily,
              conflicts_with = "every", required_unless_present = "every")]
        at: Option<Cadence>,

        /// Run at a fixed interval (e.g. 30m, 1h)
        #[arg(long, value_name = "INTERVAL", value_parser = Cadence::parse_every)]
        every: Option<Cadence>,
    },
}

/// Config location and per-run overrides shared by pipeline commands.
#[derive(Args, Clone, Debug)]
pub struct PipelineArgs {
    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Unparseable timestamp policy (drop, substitute-default)
    #[arg(long)]
    pub policy: Option<TimestampPolicy>,

    /// Raw timestamp layout (e.g. MM/DD/YYYY, "YYYY-MM-DD HH:MM:SS", auto)
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Clean the datasets concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
