//! Loads tables as CSV files in a directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Result, SluiceError};
use crate::table::Table;

use super::{Destination, LoadSession};

/// Writes each table to `<dir>/<name>.csv`.
///
/// Files are written to a hidden staging directory first and renamed into
/// place on commit.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    dir: PathBuf,
}

impl CsvDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the live file for a table.
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }
}

impl Destination for CsvDirectory {
    fn describe(&self) -> String {
        format!("csv directory {}", self.dir.display())
    }

    fn connect(&self) -> Result<Box<dyn LoadSession + '_>> {
        let staging = self.dir.join(format!(
            ".sluice-staging-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.f")
        ));
        fs::create_dir_all(&staging).map_err(|source| SluiceError::Io {
            path: staging.clone(),
            source,
        })?;
        debug!(staging = %staging.display(), "Opened CSV load session");

        Ok(Box::new(CsvSession {
            destination: self,
            staging,
            staged: Vec::new(),
        }))
    }
}

struct CsvSession<'a> {
    destination: &'a CsvDirectory,
    staging: PathBuf,
    staged: Vec<String>,
}

impl CsvSession<'_> {
    fn staged_path(&self, name: &str) -> PathBuf {
        self.staging.join(format!("{}.csv", name))
    }
}

fn persistence(table: &str, message: impl std::fmt::Display) -> SluiceError {
    SluiceError::Persistence {
        table: table.to_string(),
        message: message.to_string(),
    }
}

impl LoadSession for CsvSession<'_> {
    fn replace_table(&mut self, name: &str, table: &Table) -> Result<()> {
        let path = self.staged_path(name);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| persistence(name, e))?;

        writer
            .write_record(&table.columns)
            .map_err(|e| persistence(name, e))?;
        for row in &table.rows {
            writer
                .write_record(row.iter().map(ToString::to_string))
                .map_err(|e| persistence(name, e))?;
        }
        writer.flush().map_err(|e| persistence(name, e))?;

        if !self.staged.iter().any(|s| s == name) {
            self.staged.push(name.to_string());
        }
        debug!(table = name, rows = table.row_count(), "Staged table");
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        for name in &self.staged {
            let target = self.destination.table_path(name);
            fs::rename(self.staged_path(name), &target).map_err(|e| persistence(name, e))?;
        }
        info!(
            tables = self.staged.len(),
            dir = %self.destination.dir.display(),
            "Committed CSV tables"
        );
        // Drop removes the now-empty staging directory.
        Ok(())
    }
}

impl Drop for CsvSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.staging) {
            warn!(staging = %self.staging.display(), error = %e, "Failed to remove staging directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use tempfile::TempDir;

    fn sample() -> Table {
        Table::new(
            vec!["item_id".into(), "reorder_status".into()],
            vec![vec![Value::Integer(1), Value::Boolean(true)]],
        )
    }

    #[test]
    fn test_commit_publishes_tables() {
        let dir = TempDir::new().unwrap();
        let destination = CsvDirectory::new(dir.path());

        let mut session = destination.connect().unwrap();
        session.replace_table("inventory_data", &sample()).unwrap();
        assert!(!destination.table_path("inventory_data").exists());
        session.commit().unwrap();

        let written = fs::read_to_string(destination.table_path("inventory_data")).unwrap();
        assert_eq!(written, "item_id,reorder_status\n1,true\n");
        // Only the published file remains.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let dir = TempDir::new().unwrap();
        let destination = CsvDirectory::new(dir.path());
        fs::write(destination.table_path("inventory_data"), "old\n").unwrap();

        {
            let mut session = destination.connect().unwrap();
            session.replace_table("inventory_data", &sample()).unwrap();
        }

        let kept = fs::read_to_string(destination.table_path("inventory_data")).unwrap();
        assert_eq!(kept, "old\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
