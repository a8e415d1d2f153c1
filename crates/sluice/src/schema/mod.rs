//! Dataset schemas: the fixed column layouts of the four extracts.

mod dataset;
mod types;

pub use dataset::{Dataset, columns};
pub use types::{ColumnSpec, ColumnType};
