//! Transformation engine that runs the cleaning plan of each dataset.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::error::{Result, SluiceError};
use crate::schema::Dataset;
use crate::table::Table;

use super::cleaners;
use super::config::CleaningConfig;
use super::normalize;
use super::operations::{TransformChange, TransformOperation, TransformResult};

/// One value per dataset.
///
/// Used for the raw extracted tables (`DatasetTables<Table>`) and for the
/// engine output ([`CleanedTables`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetTables<T = Table> {
    pub branch_sales: T,
    pub online_sales: T,
    pub customers: T,
    pub inventory: T,
}

impl<T> DatasetTables<T> {
    /// Build by calling `f` once per dataset, in [`Dataset::ALL`] order.
    pub fn try_from_fn<F>(mut f: F) -> Result<Self>
    where
        F: FnMut(Dataset) -> Result<T>,
    {
        Ok(Self {
            branch_sales: f(Dataset::BranchSales)?,
            online_sales: f(Dataset::OnlineSales)?,
            customers: f(Dataset::Customers)?,
            inventory: f(Dataset::Inventory)?,
        })
    }

    pub fn get(&self, dataset: Dataset) -> &T {
        match dataset {
            Dataset::BranchSales => &self.branch_sales,
            Dataset::OnlineSales => &self.online_sales,
            Dataset::Customers => &self.customers,
            Dataset::Inventory => &self.inventory,
        }
    }

    /// Values paired with their dataset, in [`Dataset::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Dataset, &T)> {
        Dataset::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    pub fn into_array(self) -> [(Dataset, T); 4] {
        [
            (Dataset::BranchSales, self.branch_sales),
            (Dataset::OnlineSales, self.online_sales),
            (Dataset::Customers, self.customers),
            (Dataset::Inventory, self.inventory),
        ]
    }

    pub fn try_map<U, F>(self, mut f: F) -> Result<DatasetTables<U>>
    where
        F: FnMut(Dataset, T) -> Result<U>,
    {
        Ok(DatasetTables {
            branch_sales: f(Dataset::BranchSales, self.branch_sales)?,
            online_sales: f(Dataset::OnlineSales, self.online_sales)?,
            customers: f(Dataset::Customers, self.customers)?,
            inventory: f(Dataset::Inventory, self.inventory)?,
        })
    }
}

/// A cleaned table and the record of how it got that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedTable {
    pub dataset: Dataset,
    pub table: Table,
    pub result: TransformResult,
}

/// Engine output for all four datasets.
pub type CleanedTables = DatasetTables<CleanedTable>;

/// Engine for cleaning raw dataset tables.
///
/// The engine is stateless apart from its configuration, so one instance can
/// clean any number of tables, from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    config: CleaningConfig,
}

impl TransformEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// The steps [`clean`](Self::clean) will run for `dataset`.
    pub fn plan(&self, dataset: Dataset) -> Vec<TransformOperation> {
        cleaners::plan(dataset, &self.config)
    }

    /// Clean one table.
    ///
    /// Every column the plan needs is checked before anything is touched, so
    /// a schema error never leaves a half-cleaned table behind.
    pub fn clean(&self, dataset: Dataset, mut table: Table) -> Result<CleanedTable> {
        let span = info_span!("clean", dataset = dataset.table_name());
        let _guard = span.enter();
        let started = Instant::now();

        let steps = self.plan(dataset);
        let missing = table.missing_columns(steps.iter().flat_map(|s| s.required_columns()));
        if !missing.is_empty() {
            return Err(SluiceError::Schema {
                context: dataset.table_name().to_string(),
                missing,
            });
        }

        info!(rows_in = table.row_count(), steps = steps.len(), "Cleaning started");

        let mut result = TransformResult::new(dataset, table.row_count());
        for step in &steps {
            let change = self.apply_operation(dataset, step, &mut table)?;
            debug!(
                step = step.kind(),
                column = %change.column,
                values_changed = change.values_changed,
                rows_removed = change.rows_removed,
                "Step applied"
            );
            result.add_change(change);
        }

        if result.timestamp_failures > 0 {
            let affected: Vec<String> = result
                .timestamp_audits()
                .map(|audit| match &audit.key {
                    Some(key) => format!("{} (row {})", key, audit.row),
                    None => format!("row {}", audit.row),
                })
                .collect();
            warn!(
                count = result.timestamp_failures,
                policy = %self.config.timestamp_policy,
                format = %self.config.timestamp_format,
                affected = ?affected,
                "Unparseable timestamps"
            );
        }

        info!(
            rows_in = result.rows_in,
            rows_out = result.rows_out,
            duration_ms = started.elapsed().as_millis() as u64,
            "Cleaning complete"
        );

        Ok(CleanedTable {
            dataset,
            table,
            result,
        })
    }

    /// Clean every dataset, one after the other.
    pub fn clean_all(&self, tables: DatasetTables) -> Result<CleanedTables> {
        tables.try_map(|dataset, table| self.clean(dataset, table))
    }

    /// Clean every dataset on its own scoped thread.
    ///
    /// The output is identical to [`clean_all`](Self::clean_all). When several
    /// datasets fail, the error of the first in [`Dataset::ALL`] order wins.
    pub fn clean_all_parallel(&self, tables: DatasetTables) -> Result<CleanedTables> {
        let [branch, online, customers, inventory] = std::thread::scope(|scope| {
            let handles = tables
                .into_array()
                .map(|(dataset, table)| scope.spawn(move || self.clean(dataset, table)));
            handles.map(|handle| match handle.join() {
                Ok(outcome) => outcome,
                Err(panic) => std::panic::resume_unwind(panic),
            })
        });

        Ok(DatasetTables {
            branch_sales: branch?,
            online_sales: online?,
            customers: customers?,
            inventory: inventory?,
        })
    }

    fn apply_operation(
        &self,
        dataset: Dataset,
        operation: &TransformOperation,
        table: &mut Table,
    ) -> Result<TransformChange> {
        let key = Some(dataset.key_column());
        match operation {
            TransformOperation::NormalizeTimestamps { column } => {
                normalize::normalize_timestamps(table, column, &self.config, key)
            }
            TransformOperation::ImputeNumeric { column, default } => {
                normalize::impute_numeric(table, column, *default)
            }
            TransformOperation::ImputeText { column, default } => {
                normalize::impute_text(table, column, default)
            }
            TransformOperation::Lowercase { column } => normalize::lowercase(table, column),
            TransformOperation::Deduplicate => Ok(normalize::deduplicate(table, key)),
            TransformOperation::DeriveProduct {
                target,
                left,
                right,
            } => normalize::derive_product(table, target, left, right),
            TransformOperation::DeriveLessThan {
                target,
                left,
                right,
            } => normalize::derive_less_than(table, target, left, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use std::sync::{Arc, Mutex};
    use crate::transform::config::TimestampPolicy;

    fn text_table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|c| if c.is_empty() { Value::Null } else { Value::from(*c) })
                        .collect()
                })
                .collect(),
        )
    }

    fn raw_tables() -> DatasetTables {
        DatasetTables {
            branch_sales: text_table(
                &["transaction_id", "branch_id", "timestamp", "quantity", "price"],
                &[
                    &["1", "10", "01/01/2022", "2", "5.0"],
                    &["2", "10", "bad", "", "3"],
                    &["1", "10", "01/01/2022", "2", "5.0"],
                ],
            ),
            online_sales: text_table(
                &["transaction_id", "customer_id", "timestamp", "quantity", "price", "delivery_address"],
                &[&["7", "3", "02/01/2022", "1", "9.5", ""]],
            ),
            customers: text_table(
                &["customer_id", "name", "email", "loyalty_status"],
                &[&["1", "Ann", "ANN@X.COM", ""], &["1", "Ann", "ann@x.com", "Unknown"]],
            ),
            inventory: text_table(
                &["item_id", "branch_id", "stock_level", "reorder_level"],
                &[&["5", "1", "", "10"], &["6", "1", "20", ""]],
            ),
        }
    }

    #[test]
    fn test_schema_checked_before_mutation() {
        let engine = TransformEngine::new();
        let table = text_table(&["transaction_id", "timestamp"], &[&["1", "bad"]]);
        let err = engine.clean(Dataset::BranchSales, table).unwrap_err();
        match err {
            SluiceError::Schema { context, missing } => {
                assert_eq!(context, "branch_sales");
                assert_eq!(missing, vec!["quantity", "price"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_clean_all_counts() {
        let engine = TransformEngine::new();
        let cleaned = engine.clean_all(raw_tables()).unwrap();

        let branch = &cleaned.branch_sales.result;
        assert_eq!(branch.rows_in, 3);
        assert_eq!(branch.rows_out, 2);
        assert_eq!(branch.timestamp_failures, 1);
        assert_eq!(branch.duplicates_removed, 1);
        assert_eq!(branch.values_imputed, 1);
        assert_eq!(cleaned.branch_sales.table.row_count(), 2);

        // Lowercasing and imputation make the two customer rows identical.
        assert_eq!(cleaned.customers.table.row_count(), 1);
        assert_eq!(cleaned.inventory.result.columns_added, 1);
        assert_eq!(cleaned.online_sales.result.columns_added, 1);
    }

    #[test]
    fn test_drop_policy_through_engine() {
        let config = CleaningConfig::default().with_timestamp_policy(TimestampPolicy::Drop);
        let engine = TransformEngine::with_config(config);
        let cleaned = engine.clean(Dataset::BranchSales, raw_tables().branch_sales).unwrap();
        assert_eq!(cleaned.result.rows_dropped, 1);
        assert_eq!(cleaned.table.row_count(), 1);
        let audit = cleaned.result.timestamp_audits().next().unwrap();
        assert_eq!(audit.key.as_deref(), Some("2"));
        assert_eq!(audit.row, 1);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unparseable_timestamps_warn_with_rows() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let table = text_table(
            &["transaction_id", "branch_id", "timestamp", "quantity", "price"],
            &[&["1", "10", "not a date", "2", "5.0"], &["2", "10", "01/01/2022", "1", "3"]],
        );
        tracing::subscriber::with_default(subscriber, || {
            TransformEngine::new().clean(Dataset::BranchSales, table).unwrap();
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let line = output
            .lines()
            .find(|l| l.contains("Unparseable timestamps"))
            .expect("warning emitted");
        assert!(line.contains("WARN"));
        assert!(line.contains("branch_sales"));
        assert!(line.contains("count=1"));
        assert!(line.contains("policy=SUBSTITUTE_DEFAULT"));
        assert!(line.contains(r#"affected=["1 (row 0)"]"#));
        assert!(!output.contains("Cleaning complete"));
    }

    #[test]
    fn test_clean_timestamps_do_not_warn() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .finish();

        let table = text_table(
            &["transaction_id", "branch_id", "timestamp", "quantity", "price"],
            &[&["1", "10", "01/01/2022", "2", "5.0"]],
        );
        tracing::subscriber::with_default(subscriber, || {
            TransformEngine::new().clean(Dataset::BranchSales, table).unwrap();
        });

        assert!(captured.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let engine = TransformEngine::new();
        let sequential = engine.clean_all(raw_tables()).unwrap();
        let parallel = engine.clean_all_parallel(raw_tables()).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_parallel_reports_first_failure() {
        let engine = TransformEngine::new();
        let mut tables = raw_tables();
        tables.customers = text_table(&["customer_id"], &[]);
        tables.inventory = text_table(&["item_id"], &[]);
        let err = engine.clean_all_parallel(tables).unwrap_err();
        assert!(matches!(err, SluiceError::Schema { ref context, .. } if context == "customer_data"));
    }

    #[test]
    fn test_dataset_tables_order() {
        let tables = raw_tables();
        let order: Vec<_> = tables.iter().map(|(d, _)| d).collect();
        assert_eq!(order, Dataset::ALL.to_vec());
    }
}
