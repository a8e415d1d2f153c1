//! Sluice: cleaning engine for retail sales, customer and inventory extracts.
//!
//! Four datasets (branch sales, online sales, customers, inventory) are read
//! from delimited files, cleaned by a deterministic rule set and written to
//! a destination in one all-or-nothing session.
//!
//! # Cleaning rules
//!
//! - **Timestamps** are parsed with a configured format. Failures either drop
//!   the row or fall back to `1970-01-01T00:00:00`, and are reported as a
//!   warning rather than an error.
//! - **Missing values** are imputed: `0` for quantities, prices and stock
//!   levels, `"Unknown"` for delivery addresses and loyalty status.
//! - **Emails** are lowercased; missing emails stay missing.
//! - **Exact duplicate rows** are removed, keeping the first occurrence.
//! - **Derived fields**: `total_sale = quantity * price` and
//!   `reorder_status = stock_level < reorder_level`.
//!
//! # Example
//!
//! ```no_run
//! use sluice::{Dataset, Parser, TransformEngine};
//!
//! let (raw, _source) = Parser::new()
//!     .parse_dataset(Dataset::BranchSales, "branch_sales.csv")
//!     .unwrap();
//! let cleaned = TransformEngine::new().clean(Dataset::BranchSales, raw).unwrap();
//!
//! println!("Rows kept: {}", cleaned.result.rows_out);
//! println!("Bad timestamps: {}", cleaned.result.timestamp_failures);
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod load;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod transform;
pub mod validation;

pub use config::{DEFAULT_CONFIG_FILE, DestinationConfig, PipelineConfig};
pub use error::{Result, SluiceError};
pub use input::{Parser, ParserConfig, SourceMetadata};
pub use load::{CsvDirectory, Destination, LoadSession, SqliteDatabase};
pub use pipeline::{Pipeline, Preview, RunSummary};
pub use schema::{ColumnSpec, ColumnType, Dataset};
pub use table::{Table, Value};
pub use transform::{
    CleanedTable, CleanedTables, CleaningConfig, DatasetTables, DedupStage, ImputationDefaults,
    RowAudit, TimestampFormat, TimestampPolicy, TransformChange, TransformEngine,
    TransformOperation, TransformResult,
};
pub use validation::{Violation, ViolationKind, validate_cleaned};
