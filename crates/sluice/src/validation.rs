//! Post-clean invariant checks.
//!
//! These re-derive every guarantee a cleaned table must satisfy from the
//! table alone, so a loader can refuse data that somehow slipped through.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};
use crate::schema::{ColumnType, Dataset, columns};
use crate::table::{Table, Value};
use crate::transform::{CleaningConfig, DedupStage};

/// Kind of broken invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A column the cleaned dataset must carry is absent.
    MissingColumn,
    /// A cell that imputation should have filled is still missing.
    MissingValue,
    /// A timestamp cell is not a parsed timestamp.
    UnparsedTimestamp,
    /// `total_sale` differs from `quantity * price`.
    TotalSaleMismatch,
    /// `reorder_status` differs from `stock_level < reorder_level`.
    ReorderStatusMismatch,
    /// An email still contains uppercase characters.
    UppercaseEmail,
    /// A row equals an earlier row.
    DuplicateRow,
}

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Row index, for row-level violations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub column: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: {}", row, self.message),
            None => f.write_str(&self.message),
        }
    }
}

struct Checker<'a> {
    table: &'a Table,
    violations: Vec<Violation>,
}

impl<'a> Checker<'a> {
    fn column(&mut self, name: &str) -> Option<usize> {
        let idx = self.table.column_index(name);
        if idx.is_none() {
            self.push(ViolationKind::MissingColumn, None, name, format!("column '{}' is missing", name));
        }
        idx
    }

    fn push(&mut self, kind: ViolationKind, row: Option<usize>, column: &str, message: String) {
        self.violations.push(Violation {
            kind,
            row,
            column: column.to_string(),
            message,
        });
    }

    // Short rows read as missing cells.
    fn cell(&self, row: usize, col: usize) -> &'a Value {
        self.table.get(row, col).unwrap_or(&Value::Null)
    }

    fn present(&mut self, name: &str) {
        let Some(col) = self.column(name) else { return };
        for row in 0..self.table.row_count() {
            if self.cell(row, col).is_missing() {
                self.push(
                    ViolationKind::MissingValue,
                    Some(row),
                    name,
                    format!("'{}' is missing", name),
                );
            }
        }
    }

    fn timestamps(&mut self) {
        let Some(col) = self.column(columns::TIMESTAMP) else { return };
        for row in 0..self.table.row_count() {
            let cell = self.cell(row, col);
            if cell.as_timestamp().is_none() {
                self.push(
                    ViolationKind::UnparsedTimestamp,
                    Some(row),
                    columns::TIMESTAMP,
                    format!("timestamp '{}' is a {}", cell, cell.kind()),
                );
            }
        }
    }

    fn total_sale(&mut self) {
        let (Some(q), Some(p), Some(t)) = (
            self.column(columns::QUANTITY),
            self.column(columns::PRICE),
            self.column(columns::TOTAL_SALE),
        ) else {
            return;
        };
        for row in 0..self.table.row_count() {
            let expected = self
                .cell(row, q)
                .as_f64()
                .zip(self.cell(row, p).as_f64())
                .map(|(q, p)| q * p);
            let actual = self.cell(row, t).as_f64();
            let ok = matches!((expected, actual), (Some(e), Some(a)) if (e - a).abs() <= 1e-9 * e.abs().max(1.0));
            if !ok {
                self.push(
                    ViolationKind::TotalSaleMismatch,
                    Some(row),
                    columns::TOTAL_SALE,
                    format!("total_sale '{}' is not quantity * price", self.cell(row, t)),
                );
            }
        }
    }

    fn reorder_status(&mut self) {
        let (Some(s), Some(r), Some(flag)) = (
            self.column(columns::STOCK_LEVEL),
            self.column(columns::REORDER_LEVEL),
            self.column(columns::REORDER_STATUS),
        ) else {
            return;
        };
        for row in 0..self.table.row_count() {
            let expected = self
                .cell(row, s)
                .as_f64()
                .zip(self.cell(row, r).as_f64())
                .map(|(s, r)| s < r);
            if expected.is_none() || expected != self.cell(row, flag).as_bool() {
                self.push(
                    ViolationKind::ReorderStatusMismatch,
                    Some(row),
                    columns::REORDER_STATUS,
                    format!(
                        "reorder_status '{}' is not stock_level < reorder_level",
                        self.cell(row, flag)
                    ),
                );
            }
        }
    }

    fn lowercase_email(&mut self) {
        let Some(col) = self.column(columns::EMAIL) else { return };
        for row in 0..self.table.row_count() {
            if let Some(email) = self.cell(row, col).as_str() {
                if email.chars().any(char::is_uppercase) {
                    self.push(
                        ViolationKind::UppercaseEmail,
                        Some(row),
                        columns::EMAIL,
                        format!("email '{}' has uppercase characters", email),
                    );
                }
            }
        }
    }

    fn unique_rows(&mut self) {
        let mut seen: HashMap<&[Value], usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for (idx, row) in self.table.rows.iter().enumerate() {
            if let Some(first) = seen.insert(row.as_slice(), idx) {
                duplicates.push((idx, first));
                seen.insert(row.as_slice(), first);
            }
        }
        for (row, first) in duplicates {
            self.push(
                ViolationKind::DuplicateRow,
                Some(row),
                "",
                format!("duplicate of row {}", first),
            );
        }
    }
}

/// Check a cleaned table against every invariant of its dataset.
pub fn validate_cleaned(dataset: Dataset, table: &Table) -> Vec<Violation> {
    let mut checker = Checker {
        table,
        violations: Vec::new(),
    };

    // Derived columns and timestamps have their own checks.
    for spec in dataset.columns() {
        if !spec.nullable && !spec.derived && spec.column_type != ColumnType::DateTime {
            checker.present(spec.name);
        }
    }
    match dataset {
        Dataset::BranchSales | Dataset::OnlineSales => {
            checker.timestamps();
            checker.total_sale();
        }
        Dataset::Customers => checker.lowercase_email(),
        Dataset::Inventory => checker.reorder_status(),
    }
    checker.unique_rows();

    checker.violations
}

/// Fail with [`SluiceError::Invariant`] when the table has any violation.
///
/// With [`DedupStage::BeforeNormalization`], customer and inventory rows that
/// only became equal after normalization are accepted.
pub fn ensure_clean(dataset: Dataset, table: &Table, config: &CleaningConfig) -> Result<()> {
    let raw_dedup = config.dedup_stage == DedupStage::BeforeNormalization
        && matches!(dataset, Dataset::Customers | Dataset::Inventory);
    let violations: Vec<Violation> = validate_cleaned(dataset, table)
        .into_iter()
        .filter(|v| !(raw_dedup && v.kind == ViolationKind::DuplicateRow))
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SluiceError::Invariant {
            dataset,
            violations: violations.iter().map(ToString::to_string).collect(),
        })
    }
}
