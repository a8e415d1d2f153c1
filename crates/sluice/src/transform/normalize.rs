//! Column-level cleaning rules.
//!
//! Each rule works on one named column of a [`Table`] (or, for dedup, on
//! whole rows), mutates the table in place and returns a
//! [`TransformChange`] describing what it did. A missing column is a
//! [`SluiceError::Schema`] error; nothing else in here fails per row except
//! a non-numeric cell in a numeric column.

use std::collections::HashMap;

use crate::error::{Result, SluiceError};
use crate::table::{Table, Value};

use super::config::{CleaningConfig, TimestampPolicy};
use super::operations::{RowAudit, TransformChange, TransformOperation};

fn row_key(table: &Table, key_idx: Option<usize>, row: usize) -> Option<String> {
    key_idx
        .and_then(|idx| table.get(row, idx))
        .filter(|v| !v.is_missing())
        .map(ToString::to_string)
}

/// Parse the raw timestamps of `column`.
///
/// Cells already holding a timestamp are left alone. Failures (including
/// missing cells) are either replaced by the sentinel or removed, as set by
/// `config.timestamp_policy`; every failure gets a [`RowAudit`].
pub fn normalize_timestamps(
    table: &mut Table,
    column: &str,
    config: &CleaningConfig,
    key_column: Option<&str>,
) -> Result<TransformChange> {
    let col_idx = table.require_column(column)?;
    let key_idx = key_column.and_then(|k| table.column_index(k));
    let operation = TransformOperation::NormalizeTimestamps {
        column: column.to_string(),
    };
    let mut change = TransformChange::new(&operation, column);
    let sentinel = Value::Timestamp(config.sentinel_timestamp);

    let mut failed = vec![false; table.row_count()];
    for row_idx in 0..table.row_count() {
        let parsed = match table.get(row_idx, col_idx) {
            Some(Value::Timestamp(_)) => continue,
            Some(Value::Text(raw)) => config.timestamp_format.parse(raw),
            _ => None,
        };

        match parsed {
            Some(ts) => table.set(row_idx, col_idx, Value::Timestamp(ts)),
            None => {
                let original = table
                    .get(row_idx, col_idx)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let (new_value, reason) = match config.timestamp_policy {
                    TimestampPolicy::SubstituteDefault => (
                        sentinel.to_string(),
                        format!(
                            "'{}' does not match '{}'; using sentinel",
                            original, config.timestamp_format
                        ),
                    ),
                    TimestampPolicy::Drop => (
                        String::new(),
                        format!(
                            "'{}' does not match '{}'; row dropped",
                            original, config.timestamp_format
                        ),
                    ),
                };
                change.row_audits.push(RowAudit {
                    row: row_idx,
                    key: row_key(table, key_idx, row_idx),
                    column: column.to_string(),
                    original_value: original,
                    new_value,
                    reason,
                });
                failed[row_idx] = true;
                change.values_changed += 1;

                if config.timestamp_policy == TimestampPolicy::SubstituteDefault {
                    table.set(row_idx, col_idx, sentinel.clone());
                }
            }
        }
    }

    if config.timestamp_policy == TimestampPolicy::Drop && change.values_changed > 0 {
        let before = table.row_count();
        table.retain_rows(|idx, _| !failed[idx]);
        change.rows_removed = before - table.row_count();
    }

    Ok(change)
}

/// Replace missing cells of a numeric column with `default`.
///
/// Integers and numeric text become floats so that equal quantities compare
/// equal regardless of how they were written.
pub fn impute_numeric(table: &mut Table, column: &str, default: f64) -> Result<TransformChange> {
    let col_idx = table.require_column(column)?;
    let operation = TransformOperation::ImputeNumeric {
        column: column.to_string(),
        default,
    };
    let mut change = TransformChange::new(&operation, column);

    for row_idx in 0..table.row_count() {
        let Some(value) = table.get(row_idx, col_idx) else {
            continue;
        };

        let replacement = if value.is_missing() {
            change.row_audits.push(RowAudit {
                row: row_idx,
                key: None,
                column: column.to_string(),
                original_value: String::new(),
                new_value: default.to_string(),
                reason: "Missing value imputed".to_string(),
            });
            change.values_changed += 1;
            Value::Float(default)
        } else {
            match value {
                Value::Float(_) => continue,
                Value::Integer(i) => Value::Float(*i as f64),
                Value::Text(s) => match s.trim().parse::<f64>() {
                    Ok(f) if !f.is_nan() => Value::Float(f),
                    _ => {
                        return Err(SluiceError::InvalidValue {
                            column: column.to_string(),
                            row: row_idx,
                            value: s.clone(),
                        });
                    }
                },
                other => {
                    return Err(SluiceError::InvalidValue {
                        column: column.to_string(),
                        row: row_idx,
                        value: format!("{} ({})", other, other.kind()),
                    });
                }
            }
        };
        table.set(row_idx, col_idx, replacement);
    }

    Ok(change)
}

/// Replace missing cells of a text column with `default`.
pub fn impute_text(table: &mut Table, column: &str, default: &str) -> Result<TransformChange> {
    let col_idx = table.require_column(column)?;
    let operation = TransformOperation::ImputeText {
        column: column.to_string(),
        default: default.to_string(),
    };
    let mut change = TransformChange::new(&operation, column);

    for row_idx in 0..table.row_count() {
        if table.get(row_idx, col_idx).is_some_and(Value::is_missing) {
            change.row_audits.push(RowAudit {
                row: row_idx,
                key: None,
                column: column.to_string(),
                original_value: String::new(),
                new_value: default.to_string(),
                reason: "Missing value imputed".to_string(),
            });
            table.set(row_idx, col_idx, Value::Text(default.to_string()));
            change.values_changed += 1;
        }
    }

    Ok(change)
}

/// Lowercase the text cells of a column. Missing cells stay missing.
pub fn lowercase(table: &mut Table, column: &str) -> Result<TransformChange> {
    let col_idx = table.require_column(column)?;
    let operation = TransformOperation::Lowercase {
        column: column.to_string(),
    };
    let mut change = TransformChange::new(&operation, column);

    for row_idx in 0..table.row_count() {
        let Some(Value::Text(text)) = table.get(row_idx, col_idx) else {
            continue;
        };
        let lower = text.to_lowercase();
        if &lower != text {
            change.row_audits.push(RowAudit {
                row: row_idx,
                key: None,
                column: column.to_string(),
                original_value: text.clone(),
                new_value: lower.clone(),
                reason: "Case folded".to_string(),
            });
            table.set(row_idx, col_idx, Value::Text(lower));
            change.values_changed += 1;
        }
    }

    Ok(change)
}

/// Remove rows equal in every column to an earlier row.
///
/// The first occurrence survives and relative order is preserved.
pub fn deduplicate(table: &mut Table, key_column: Option<&str>) -> TransformChange {
    let mut change = TransformChange::new(&TransformOperation::Deduplicate, "");
    let key_idx = key_column.and_then(|k| table.column_index(k));

    let mut first_seen: HashMap<&[Value], usize> = HashMap::with_capacity(table.row_count());
    let mut duplicate_of: Vec<Option<usize>> = Vec::with_capacity(table.row_count());
    for (row_idx, row) in table.rows.iter().enumerate() {
        match first_seen.get(row.as_slice()) {
            Some(&first) => duplicate_of.push(Some(first)),
            None => {
                first_seen.insert(row.as_slice(), row_idx);
                duplicate_of.push(None);
            }
        }
    }
    drop(first_seen);

    for (row_idx, first) in duplicate_of.iter().enumerate() {
        if let Some(first) = first {
            change.row_audits.push(RowAudit {
                row: row_idx,
                key: row_key(table, key_idx, row_idx),
                column: String::new(),
                original_value: String::new(),
                new_value: String::new(),
                reason: format!("Duplicate of row {}", first),
            });
        }
    }

    if !change.row_audits.is_empty() {
        table.retain_rows(|idx, _| duplicate_of[idx].is_none());
        change.rows_removed = change.row_audits.len();
    }

    change
}

/// Numeric view of a cell that must already be imputed.
fn numeric_cell(table: &Table, row: usize, col: usize, column: &str) -> Result<f64> {
    let value = table.get(row, col).cloned().unwrap_or_default();
    value.as_f64().ok_or_else(|| SluiceError::InvalidValue {
        column: column.to_string(),
        row,
        value: value.to_string(),
    })
}

fn derive<F>(
    table: &mut Table,
    operation: &TransformOperation,
    target: &str,
    left: &str,
    right: &str,
    compute: F,
) -> Result<TransformChange>
where
    F: Fn(f64, f64) -> Value,
{
    let left_idx = table.require_column(left)?;
    let right_idx = table.require_column(right)?;
    let mut change = TransformChange::new(operation, target);
    change.column_added = !table.has_column(target);
    let target_idx = table.ensure_column(target);

    for row_idx in 0..table.row_count() {
        let l = numeric_cell(table, row_idx, left_idx, left)?;
        let r = numeric_cell(table, row_idx, right_idx, right)?;
        let value = compute(l, r);
        if table.get(row_idx, target_idx) != Some(&value) {
            table.set(row_idx, target_idx, value);
            change.values_changed += 1;
        }
    }

    Ok(change)
}

/// Set `target = left * right` on every row, creating `target` if absent.
pub fn derive_product(
    table: &mut Table,
    target: &str,
    left: &str,
    right: &str,
) -> Result<TransformChange> {
    let operation = TransformOperation::DeriveProduct {
        target: target.to_string(),
        left: left.to_string(),
        right: right.to_string(),
    };
    derive(table, &operation, target, left, right, |l, r| Value::Float(l * r))
}

/// Set `target = left < right` on every row, creating `target` if absent.
pub fn derive_less_than(
    table: &mut Table,
    target: &str,
    left: &str,
    right: &str,
) -> Result<TransformChange> {
    let operation = TransformOperation::DeriveLessThan {
        target: target.to_string(),
        left: left.to_string(),
        right: right.to_string(),
    };
    derive(table, &operation, target, left, right, |l, r| Value::Boolean(l < r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::config::TimestampFormat;
    use chrono::NaiveDate;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn config(policy: TimestampPolicy) -> CleaningConfig {
        CleaningConfig::default()
            .with_timestamp_format(TimestampFormat::new("MM/DD/YYYY").unwrap())
            .with_timestamp_policy(policy)
    }

    fn timestamps() -> Table {
        table(
            &["id", "timestamp"],
            vec![
                vec![Value::Integer(1), "01/01/2022".into()],
                vec![Value::Integer(2), "invalid_date".into()],
                vec![Value::Integer(3), Value::Null],
                vec![Value::Integer(4), "02/15/2022".into()],
            ],
        )
    }

    #[test]
    fn test_timestamps_substitute_default() {
        let mut t = timestamps();
        let change =
            normalize_timestamps(&mut t, "timestamp", &config(TimestampPolicy::SubstituteDefault), Some("id"))
                .unwrap();

        assert_eq!(t.row_count(), 4);
        assert_eq!(change.values_changed, 2);
        assert_eq!(change.rows_removed, 0);
        assert_eq!(t.get(1, 1).unwrap().to_string(), "1970-01-01T00:00:00");
        assert_eq!(
            t.get(0, 1),
            Some(&Value::Timestamp(
                NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
            ))
        );
        let keys: Vec<_> = change.row_audits.iter().map(|a| a.key.clone()).collect();
        assert_eq!(keys, vec![Some("2".to_string()), Some("3".to_string())]);
    }

    #[test]
    fn test_timestamps_drop() {
        let mut t = timestamps();
        let change =
            normalize_timestamps(&mut t, "timestamp", &config(TimestampPolicy::Drop), Some("id")).unwrap();

        assert_eq!(t.row_count(), 2);
        assert_eq!(change.rows_removed, 2);
        let ids: Vec<_> = t.column_values(0).cloned().collect();
        assert_eq!(ids, vec![Value::Integer(1), Value::Integer(4)]);
    }

    #[test]
    fn test_timestamps_already_parsed_pass_through() {
        let mut t = timestamps();
        let cfg = config(TimestampPolicy::SubstituteDefault);
        normalize_timestamps(&mut t, "timestamp", &cfg, None).unwrap();
        let snapshot = t.clone();
        let change = normalize_timestamps(&mut t, "timestamp", &cfg, None).unwrap();
        assert_eq!(change.values_changed, 0);
        assert_eq!(t, snapshot);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let mut t = timestamps();
        let err = impute_numeric(&mut t, "quantity", 0.0).unwrap_err();
        assert!(matches!(err, SluiceError::Schema { .. }));
    }

    #[test]
    fn test_impute_numeric() {
        let mut t = table(
            &["quantity"],
            vec![
                vec![Value::Null],
                vec![Value::Integer(5)],
                vec![Value::Float(f64::NAN)],
                vec![" 2.5 ".into()],
            ],
        );
        let change = impute_numeric(&mut t, "quantity", 0.0).unwrap();
        assert_eq!(change.values_changed, 2);
        let values: Vec<_> = t.column_values(0).cloned().collect();
        assert_eq!(
            values,
            vec![Value::Float(0.0), Value::Float(5.0), Value::Float(0.0), Value::Float(2.5)]
        );
    }

    #[test]
    fn test_impute_numeric_rejects_text() {
        let mut t = table(&["price"], vec![vec!["ten".into()]]);
        let err = impute_numeric(&mut t, "price", 0.0).unwrap_err();
        assert!(matches!(err, SluiceError::InvalidValue { row: 0, .. }));
    }

    #[test]
    fn test_impute_text_and_lowercase() {
        let mut t = table(
            &["email", "status"],
            vec![
                vec!["USER@EXAMPLE.COM".into(), Value::Null],
                vec![Value::Null, "Gold".into()],
            ],
        );
        let lowered = lowercase(&mut t, "email").unwrap();
        let imputed = impute_text(&mut t, "status", "Unknown").unwrap();

        assert_eq!(lowered.values_changed, 1);
        assert_eq!(imputed.values_changed, 1);
        assert_eq!(t.get(0, 0), Some(&Value::from("user@example.com")));
        assert_eq!(t.get(1, 0), Some(&Value::Null));
        assert_eq!(t.get(0, 1), Some(&Value::from("Unknown")));
        assert_eq!(t.get(1, 1), Some(&Value::from("Gold")));
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let mut t = table(
            &["id", "qty"],
            vec![
                vec![Value::Integer(1), 2.0.into()],
                vec![Value::Integer(2), 3.0.into()],
                vec![Value::Integer(1), 2.0.into()],
                vec![Value::Integer(1), 4.0.into()],
                vec![Value::Integer(2), 3.0.into()],
            ],
        );
        let change = deduplicate(&mut t, Some("id"));

        assert_eq!(change.rows_removed, 2);
        assert_eq!(change.row_audits[0].reason, "Duplicate of row 0");
        assert_eq!(
            t.rows,
            vec![
                vec![Value::Integer(1), Value::Float(2.0)],
                vec![Value::Integer(2), Value::Float(3.0)],
                vec![Value::Integer(1), Value::Float(4.0)],
            ]
        );
    }

    #[test]
    fn test_derive_product_overwrites_and_appends() {
        let mut t = table(
            &["quantity", "price", "total_sale"],
            vec![vec![2.0.into(), 10.0.into(), Value::Null]],
        );
        let change = derive_product(&mut t, "total_sale", "quantity", "price").unwrap();
        assert!(!change.column_added);
        assert_eq!(t.get(0, 2), Some(&Value::Float(20.0)));

        let mut t = table(&["quantity", "price"], vec![vec![3.0.into(), 1.5.into()]]);
        let change = derive_product(&mut t, "total_sale", "quantity", "price").unwrap();
        assert!(change.column_added);
        assert_eq!(t.columns.last().map(String::as_str), Some("total_sale"));
        assert_eq!(t.get(0, 2), Some(&Value::Float(4.5)));
    }

    #[test]
    fn test_derive_less_than() {
        let mut t = table(
            &["stock_level", "reorder_level"],
            vec![vec![0.0.into(), 10.0.into()], vec![10.0.into(), 5.0.into()]],
        );
        derive_less_than(&mut t, "reorder_status", "stock_level", "reorder_level").unwrap();
        let flags: Vec<_> = t.column_values(2).cloned().collect();
        assert_eq!(flags, vec![Value::Boolean(true), Value::Boolean(false)]);
    }

    #[test]
    fn test_derive_requires_imputed_operands() {
        let mut t = table(&["stock_level", "reorder_level"], vec![vec![Value::Null, 1.0.into()]]);
        assert!(derive_less_than(&mut t, "reorder_status", "stock_level", "reorder_level").is_err());
    }
}
