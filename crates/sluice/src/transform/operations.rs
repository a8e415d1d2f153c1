//! Cleaning operations and the audit trail they produce.

use serde::{Deserialize, Serialize};

use crate::schema::Dataset;

/// A single cleaning step applied to a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOperation {
    /// Parse raw timestamps using the configured format and policy.
    NormalizeTimestamps { column: String },

    /// Replace missing numbers with a default.
    ImputeNumeric { column: String, default: f64 },

    /// Replace missing text with a default.
    ImputeText { column: String, default: String },

    /// Lowercase non-missing text.
    Lowercase { column: String },

    /// Remove rows equal in every column to an earlier row.
    Deduplicate,

    /// `target = left * right`.
    DeriveProduct {
        target: String,
        left: String,
        right: String,
    },

    /// `target = left < right`.
    DeriveLessThan {
        target: String,
        left: String,
        right: String,
    },
}

impl TransformOperation {
    /// Short machine-friendly name of the step.
    pub fn kind(&self) -> &'static str {
        match self {
            TransformOperation::NormalizeTimestamps { .. } => "normalize_timestamps",
            TransformOperation::ImputeNumeric { .. } => "impute_numeric",
            TransformOperation::ImputeText { .. } => "impute_text",
            TransformOperation::Lowercase { .. } => "lowercase",
            TransformOperation::Deduplicate => "deduplicate",
            TransformOperation::DeriveProduct { .. } => "derive_product",
            TransformOperation::DeriveLessThan { .. } => "derive_less_than",
        }
    }

    /// Get a human-readable description of the operation.
    pub fn description(&self) -> String {
        match self {
            TransformOperation::NormalizeTimestamps { column } => {
                format!("Parse timestamps in '{}'", column)
            }
            TransformOperation::ImputeNumeric { column, default } => {
                format!("Fill missing '{}' with {}", column, default)
            }
            TransformOperation::ImputeText { column, default } => {
                format!("Fill missing '{}' with '{}'", column, default)
            }
            TransformOperation::Lowercase { column } => {
                format!("Lowercase '{}'", column)
            }
            TransformOperation::Deduplicate => "Remove duplicate rows".to_string(),
            TransformOperation::DeriveProduct {
                target,
                left,
                right,
            } => format!("Compute '{}' = '{}' × '{}'", target, left, right),
            TransformOperation::DeriveLessThan {
                target,
                left,
                right,
            } => format!("Compute '{}' = '{}' < '{}'", target, left, right),
        }
    }

    /// Columns that must exist before the step can run.
    ///
    /// Derived targets are not listed: they are created when absent.
    pub fn required_columns(&self) -> Vec<&str> {
        match self {
            TransformOperation::NormalizeTimestamps { column }
            | TransformOperation::ImputeNumeric { column, .. }
            | TransformOperation::ImputeText { column, .. }
            | TransformOperation::Lowercase { column } => vec![column.as_str()],
            TransformOperation::Deduplicate => Vec::new(),
            TransformOperation::DeriveProduct { left, right, .. }
            | TransformOperation::DeriveLessThan { left, right, .. } => {
                vec![left.as_str(), right.as_str()]
            }
        }
    }
}

/// Result of cleaning one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResult {
    /// Dataset that was cleaned.
    pub dataset: Dataset,

    /// Rows handed to the engine.
    pub rows_in: usize,

    /// Rows in the cleaned table.
    pub rows_out: usize,

    /// Timestamps that failed to parse.
    pub timestamp_failures: usize,

    /// Rows removed because their timestamp failed to parse.
    pub rows_dropped: usize,

    /// Rows removed as exact duplicates.
    pub duplicates_removed: usize,

    /// Missing cells replaced by a default.
    pub values_imputed: usize,

    /// Text cells changed by case folding.
    pub values_lowercased: usize,

    /// Columns appended by derivation steps.
    pub columns_added: usize,

    /// Detailed changes for each operation.
    pub changes: Vec<TransformChange>,
}

impl TransformResult {
    /// Create an empty result.
    pub fn new(dataset: Dataset, rows_in: usize) -> Self {
        Self {
            dataset,
            rows_in,
            rows_out: rows_in,
            timestamp_failures: 0,
            rows_dropped: 0,
            duplicates_removed: 0,
            values_imputed: 0,
            values_lowercased: 0,
            columns_added: 0,
            changes: Vec::new(),
        }
    }

    /// Add a change to the result, updating the counters.
    pub fn add_change(&mut self, change: TransformChange) {
        match change.kind.as_str() {
            "normalize_timestamps" => {
                self.timestamp_failures += change.values_changed;
                self.rows_dropped += change.rows_removed;
            }
            "deduplicate" => self.duplicates_removed += change.rows_removed,
            "impute_numeric" | "impute_text" => self.values_imputed += change.values_changed,
            "lowercase" => self.values_lowercased += change.values_changed,
            _ => {}
        }
        if change.column_added {
            self.columns_added += 1;
        }
        self.rows_out = self.rows_out.saturating_sub(change.rows_removed);
        self.changes.push(change);
    }

    /// All audits from timestamp normalization.
    pub fn timestamp_audits(&self) -> impl Iterator<Item = &RowAudit> {
        self.changes
            .iter()
            .filter(|c| c.kind == "normalize_timestamps")
            .flat_map(|c| c.row_audits.iter())
    }

    /// True when no step changed anything.
    pub fn is_clean(&self) -> bool {
        self.changes
            .iter()
            .all(|c| c.values_changed == 0 && c.rows_removed == 0 && !c.column_added)
    }
}

/// A single change made during cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformChange {
    /// Operation kind (see [`TransformOperation::kind`]).
    pub kind: String,

    /// Description of the change.
    pub description: String,

    /// Column affected (empty for row-level steps).
    pub column: String,

    /// Number of cells changed.
    pub values_changed: usize,

    /// Number of rows removed.
    pub rows_removed: usize,

    /// Whether the step appended a new column.
    #[serde(default)]
    pub column_added: bool,

    /// Per-row audit information.
    pub row_audits: Vec<RowAudit>,
}

impl TransformChange {
    pub(crate) fn new(operation: &TransformOperation, column: &str) -> Self {
        Self {
            kind: operation.kind().to_string(),
            description: operation.description(),
            column: column.to_string(),
            values_changed: 0,
            rows_removed: 0,
            column_added: false,
            row_audits: Vec::new(),
        }
    }
}

/// Audit information for a single row change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowAudit {
    /// Row index (0-based) in the table the step received.
    pub row: usize,

    /// Value of the dataset's key column, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Column that was changed.
    pub column: String,

    /// Original value before the step.
    pub original_value: String,

    /// New value after the step (empty when the row was removed).
    pub new_value: String,

    /// Reason for the change.
    pub reason: String,
}

