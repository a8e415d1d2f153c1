//! Core type definitions for schema representation.

use serde::{Deserialize, Serialize};

/// Declared data type for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Whole numbers (identifiers).
    Integer,
    /// Floating-point numbers (quantities, prices, stock levels).
    Float,
    /// Text/string values.
    String,
    /// Boolean values (true/false).
    Boolean,
    /// Date and/or time values.
    DateTime,
}

impl ColumnType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// SQL storage class used by the SQLite destination.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::String | ColumnType::DateTime => "TEXT",
        }
    }
}

/// Declaration of one column of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    /// May still be missing after cleaning.
    pub nullable: bool,
    /// Computed by the engine rather than read from the extract.
    pub derived: bool,
}

impl ColumnSpec {
    pub(crate) const fn raw(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: true,
            derived: false,
        }
    }

    /// A raw column that cleaning fills in.
    pub(crate) const fn required(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            nullable: false,
            ..Self::raw(name, column_type)
        }
    }

    pub(crate) const fn derived(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            derived: true,
        }
    }
}
