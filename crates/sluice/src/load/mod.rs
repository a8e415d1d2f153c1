//! Destinations for cleaned tables.
//!
//! A run opens one [`LoadSession`], replaces every table through it and
//! commits once. A session dropped without [`LoadSession::commit`] rolls
//! back whatever it wrote, so a failed run leaves the previous tables in
//! place.

mod csv_dir;
mod sqlite;

pub use csv_dir::CsvDirectory;
pub use sqlite::SqliteDatabase;

use crate::error::Result;
use crate::table::Table;

/// Somewhere cleaned tables can be written.
pub trait Destination: Send + Sync {
    /// Human-readable description for logs and summaries.
    fn describe(&self) -> String;

    /// Start a load session.
    fn connect(&self) -> Result<Box<dyn LoadSession + '_>>;
}

/// One scoped, all-or-nothing write of a set of tables.
pub trait LoadSession {
    /// Replace `name` with the contents of `table`.
    fn replace_table(&mut self, name: &str, table: &Table) -> Result<()>;

    /// Publish every table replaced in this session.
    fn commit(self: Box<Self>) -> Result<()>;
}
