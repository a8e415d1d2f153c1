//! Error types for the sluice library.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::Dataset;

/// Main error type for sluice operations.
///
/// Every variant is fatal for the run that produced it. Per-row timestamp
/// defects are not errors: they are handled by the configured
/// [`TimestampPolicy`](crate::TimestampPolicy) and reported as warnings.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A raw cell could not be coerced to its column type during extraction.
    #[error("Parse error at row {row}, column '{column}': {message}")]
    Parse {
        row: usize,
        column: String,
        message: String,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// One or more expected columns are absent from an input table.
    #[error("Schema error in {context}: missing column(s) {}", .missing.join(", "))]
    Schema {
        context: String,
        missing: Vec<String>,
    },

    /// A cell holds a value the cleaning step cannot interpret.
    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// Empty file or no columns to read.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Writing a cleaned table to the destination failed.
    #[error("Persistence error for table '{table}': {message}")]
    Persistence { table: String, message: String },

    /// Error from the SQLite driver.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A cleaned table failed its post-clean invariant checks.
    #[error("{dataset} failed {} invariant check(s); first: {}", .violations.len(), .violations.first().map(String::as_str).unwrap_or("-"))]
    Invariant {
        dataset: Dataset,
        violations: Vec<String>,
    },
}

/// Result type alias for sluice operations.
pub type Result<T> = std::result::Result<T, SluiceError>;
