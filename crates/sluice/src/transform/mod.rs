//! Cleaning rules, per-dataset plans and the engine that runs them.

pub mod cleaners;
mod config;
mod engine;
pub mod normalize;
mod operations;

pub use config::{
    CleaningConfig, DedupStage, ImputationDefaults, TimestampFormat, TimestampPolicy,
    sentinel_epoch,
};
pub use engine::{CleanedTable, CleanedTables, DatasetTables, TransformEngine};
pub use operations::{RowAudit, TransformChange, TransformOperation, TransformResult};
