//! Loads tables into a SQLite database in one transaction.

use std::path::{Path, PathBuf};

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use rusqlite::{Connection, params_from_iter};
use tracing::{debug, info, warn};

use crate::error::{Result, SluiceError};
use crate::schema::ColumnType;
use crate::table::{Table, Value};

use super::{Destination, LoadSession};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => SqlValue::Null,
            Value::Float(f) if f.is_nan() => SqlValue::Null,
            Value::Float(f) => SqlValue::Real(*f),
            Value::Integer(i) => SqlValue::Integer(*i),
            Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
            Value::Text(_) | Value::Timestamp(_) => SqlValue::Text(self.to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// A SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    path: PathBuf,
}

impl SqliteDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Destination for SqliteDatabase {
    fn describe(&self) -> String {
        format!("sqlite database {}", self.path.display())
    }

    fn connect(&self) -> Result<Box<dyn LoadSession + '_>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SluiceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        debug!(path = %self.path.display(), "Opened SQLite load session");
        Ok(Box::new(SqliteSession {
            conn,
            open: true,
            tables: 0,
        }))
    }
}

struct SqliteSession {
    conn: Connection,
    open: bool,
    tables: usize,
}

/// Quote an identifier for use in SQL.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Storage type for a column, from the values it holds.
///
/// Integer and float columns widen to float; any other mix is text, as is a
/// column with no values at all.
fn infer_column_type<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let mut inferred: Option<ColumnType> = None;
    for value in values {
        let kind = match value {
            v if v.is_missing() => continue,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Timestamp(_) => ColumnType::DateTime,
            _ => return ColumnType::String,
        };
        inferred = match (inferred, kind) {
            (None, k) => Some(k),
            (Some(a), b) if a == b => Some(a),
            (Some(a), b) if a.is_numeric() && b.is_numeric() => Some(ColumnType::Float),
            _ => return ColumnType::String,
        };
    }
    inferred.unwrap_or(ColumnType::String)
}

impl SqliteSession {
    fn write(&self, name: &str, table: &Table) -> rusqlite::Result<()> {
        let ident = quote_ident(name);
        let column_defs: Vec<String> = (0..table.column_count())
            .map(|idx| {
                format!(
                    "{} {}",
                    quote_ident(&table.columns[idx]),
                    infer_column_type(table.column_values(idx)).sql_type()
                )
            })
            .collect();

        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", ident))?;
        self.conn.execute_batch(&format!(
            "CREATE TABLE {} ({})",
            ident,
            column_defs.join(", ")
        ))?;

        let placeholders = vec!["?"; table.column_count()].join(", ");
        let mut stmt = self
            .conn
            .prepare(&format!("INSERT INTO {} VALUES ({})", ident, placeholders))?;
        for row in &table.rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }
        Ok(())
    }
}

impl LoadSession for SqliteSession {
    fn replace_table(&mut self, name: &str, table: &Table) -> Result<()> {
        self.write(name, table)
            .map_err(|e| SluiceError::Persistence {
                table: name.to_string(),
                message: e.to_string(),
            })?;
        self.tables += 1;
        debug!(table = name, rows = table.row_count(), "Wrote table");
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        info!(tables = self.tables, "Committed SQLite transaction");
        Ok(())
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Rollback failed");
            }
        }
    }
}
