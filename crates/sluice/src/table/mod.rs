//! In-memory table model shared by the extractor, the engine and the loaders.

mod value;

pub use value::{TIMESTAMP_DISPLAY_FORMAT, Value};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};

/// An ordered table of named columns, stored row-major.
///
/// Rows are not keyed; two rows are the same only if every cell is equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Row data; every row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from columns and rows.
    ///
    /// Short rows are padded with `Null` and long rows truncated so the
    /// table stays rectangular.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Create an empty table with the given column names.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the table width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column that must exist.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| SluiceError::Schema {
            context: "table".to_string(),
            missing: vec![name.to_string()],
        })
    }

    /// Names from `names` that are not columns of this table.
    pub fn missing_columns<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for name in names {
            if !self.has_column(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        missing
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Overwrite a cell. Out-of-range positions are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: Value) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// All values of a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// All values of a column by name.
    pub fn column_by_name(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.column_values(index).collect())
    }

    /// Append a column filled with `fill`, returning its index.
    pub fn add_column(&mut self, name: impl Into<String>, fill: Value) -> usize {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
        self.columns.len() - 1
    }

    /// Index of an existing column, or of a newly appended `Null` column.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        match self.column_index(name) {
            Some(index) => index,
            None => self.add_column(name, Value::Null),
        }
    }

    /// Keep only rows for which `keep(index, row)` is true, preserving order.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let mut index = 0;
        self.rows.retain(|row| {
            let kept = keep(index, row);
            index += 1;
            kept
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Integer(1), Value::from("a")],
                vec![Value::Integer(2)],
                vec![Value::Integer(3), Value::from("c"), Value::from("extra")],
            ],
        )
    }

    #[test]
    fn test_new_pads_and_truncates() {
        let table = sample();
        assert_eq!(table.row_count(), 3);
        assert!(table.rows.iter().all(|r| r.len() == 2));
        assert_eq!(table.get(1, 1), Some(&Value::Null));
    }

    #[test]
    fn test_column_lookup() {
        let table = sample();
        assert_eq!(table.column_index("name"), Some(1));
        assert_eq!(table.column_index("missing"), None);
        let ids = table.column_by_name("id").unwrap();
        assert_eq!(ids, vec![&Value::Integer(1), &Value::Integer(2), &Value::Integer(3)]);
    }

    #[test]
    fn test_require_column() {
        let table = sample();
        assert_eq!(table.require_column("id").unwrap(), 0);
        let err = table.require_column("price").unwrap_err();
        assert!(matches!(err, SluiceError::Schema { ref missing, .. } if missing == &["price"]));
        assert_eq!(table.missing_columns(["id", "a", "b", "a"]), vec!["a", "b"]);
    }

    #[test]
    fn test_ensure_column_appends_once() {
        let mut table = sample();
        let idx = table.ensure_column("flag");
        assert_eq!(idx, 2);
        assert_eq!(table.ensure_column("flag"), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.get(0, 2), Some(&Value::Null));
    }

    #[test]
    fn test_retain_rows_preserves_order() {
        let mut table = sample();
        table.retain_rows(|index, _| index != 1);
        let ids: Vec<_> = table.column_values(0).cloned().collect();
        assert_eq!(ids, vec![Value::Integer(1), Value::Integer(3)]);
    }
}
