//! Property-based tests for the cleaning engine.
//!
//! These generate raw tables with missing values, malformed timestamps and
//! repeated rows, and check that every cleaned table satisfies its dataset
//! invariants.
//!
//! ```bash
//! PROPTEST_CASES=10000 cargo test -p sluice --test property_tests
//! ```

use proptest::prelude::*;

use sluice::{
    CleaningConfig, Dataset, DedupStage, Table, TimestampPolicy, TransformEngine, Value,
    ViolationKind, validate_cleaned,
};

// =============================================================================
// Test Strategies
// =============================================================================

/// A numeric cell as extraction would produce it, sometimes missing.
fn number() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        4 => (0u32..500).prop_map(|n| Value::Float(f64::from(n) / 4.0)),
    ]
}

/// A raw timestamp string: valid, malformed or missing.
fn raw_timestamp() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => (1u32..=12, 1u32..=28, 2000i32..2030)
            .prop_map(|(m, d, y)| Value::Text(format!("{:02}/{:02}/{}", m, d, y))),
        1 => "[a-z_]{1,12}".prop_map(Value::Text),
        1 => Just(Value::Null),
    ]
}

fn optional_text(pattern: &'static str) -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        3 => pattern.prop_map(Value::Text),
    ]
}

/// Rows drawn from a small pool, so exact duplicates are common.
fn with_repeats(rows: Vec<Vec<Value>>, picks: Vec<prop::sample::Index>) -> Vec<Vec<Value>> {
    if rows.is_empty() {
        return rows;
    }
    picks.into_iter().map(|i| rows[i.index(rows.len())].clone()).collect()
}

fn branch_sales() -> impl Strategy<Value = Table> {
    let row = (0i64..5, raw_timestamp(), number(), number())
        .prop_map(|(id, ts, q, p)| vec![Value::Integer(id), Value::Integer(1), ts, Value::Integer(9), q, p]);
    (
        prop::collection::vec(row, 0..12),
        prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    )
        .prop_map(|(rows, picks)| {
            Table::new(
                ["transaction_id", "branch_id", "timestamp", "item_id", "quantity", "price"]
                    .map(String::from)
                    .to_vec(),
                with_repeats(rows, picks),
            )
        })
}

fn customers() -> impl Strategy<Value = Table> {
    let row = (0i64..4, optional_text("[A-Za-z]{1,6}@[A-Za-z]{1,4}\\.COM"), optional_text("(Gold|Silver|Bronze)"))
        .prop_map(|(id, email, status)| vec![Value::Integer(id), Value::from("n"), email, status]);
    (
        prop::collection::vec(row, 0..12),
        prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    )
        .prop_map(|(rows, picks)| {
            Table::new(
                ["customer_id", "name", "email", "loyalty_status"]
                    .map(String::from)
                    .to_vec(),
                with_repeats(rows, picks),
            )
        })
}

fn inventory() -> impl Strategy<Value = Table> {
    let row = (0i64..5, number(), number())
        .prop_map(|(id, s, r)| vec![Value::Integer(id), Value::Null, s, r]);
    (
        prop::collection::vec(row, 0..12),
        prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    )
        .prop_map(|(rows, picks)| {
            Table::new(
                ["item_id", "branch_id", "stock_level", "reorder_level"]
                    .map(String::from)
                    .to_vec(),
                with_repeats(rows, picks),
            )
        })
}

fn config() -> impl Strategy<Value = CleaningConfig> {
    (
        prop_oneof![Just(TimestampPolicy::Drop), Just(TimestampPolicy::SubstituteDefault)],
        prop_oneof![Just(DedupStage::BeforeNormalization), Just(DedupStage::AfterNormalization)],
    )
        .prop_map(|(policy, stage)| {
            CleaningConfig::default()
                .with_timestamp_policy(policy)
                .with_dedup_stage(stage)
        })
}

// =============================================================================
// Invariants
// =============================================================================

proptest! {
    #[test]
    fn branch_sales_satisfy_invariants(table in branch_sales(), config in config()) {
        let engine = TransformEngine::with_config(config);
        let cleaned = engine.clean(Dataset::BranchSales, table).unwrap();
        prop_assert!(validate_cleaned(Dataset::BranchSales, &cleaned.table).is_empty());
        prop_assert_eq!(cleaned.result.rows_out, cleaned.table.row_count());
    }

    #[test]
    fn drop_policy_removes_exactly_failures(table in branch_sales()) {
        let config = CleaningConfig::default().with_timestamp_policy(TimestampPolicy::Drop);
        let cleaned = TransformEngine::with_config(config)
            .clean(Dataset::BranchSales, table)
            .unwrap();
        let result = &cleaned.result;
        prop_assert_eq!(result.rows_dropped, result.timestamp_failures);
        prop_assert_eq!(
            result.rows_in - result.rows_dropped - result.duplicates_removed,
            cleaned.table.row_count()
        );
    }

    #[test]
    fn substitute_policy_keeps_every_row_until_dedup(table in branch_sales()) {
        let cleaned = TransformEngine::new().clean(Dataset::BranchSales, table).unwrap();
        prop_assert_eq!(cleaned.result.rows_dropped, 0);
        prop_assert_eq!(
            cleaned.result.rows_in - cleaned.result.duplicates_removed,
            cleaned.table.row_count()
        );
    }

    #[test]
    fn customers_satisfy_invariants(table in customers(), config in config()) {
        let raw_dedup = config.dedup_stage == DedupStage::BeforeNormalization;
        let cleaned = TransformEngine::with_config(config).clean(Dataset::Customers, table).unwrap();
        // Dedup on raw rows can leave rows that only became equal later.
        let unexpected: Vec<_> = validate_cleaned(Dataset::Customers, &cleaned.table)
            .into_iter()
            .filter(|v| !(raw_dedup && v.kind == ViolationKind::DuplicateRow))
            .collect();
        prop_assert!(unexpected.is_empty(), "{:?}", unexpected);
    }

    #[test]
    fn inventory_satisfies_invariants(table in inventory()) {
        let cleaned = TransformEngine::new().clean(Dataset::Inventory, table).unwrap();
        prop_assert!(validate_cleaned(Dataset::Inventory, &cleaned.table).is_empty());
    }

    #[test]
    fn dedup_keeps_first_occurrences_in_order(table in inventory()) {
        let cleaned = TransformEngine::new().clean(Dataset::Inventory, table).unwrap();
        let rows = &cleaned.table.rows;
        for (i, row) in rows.iter().enumerate() {
            prop_assert!(!rows[..i].contains(row));
        }
    }

    #[test]
    fn cleaning_is_idempotent(
        branch in branch_sales(),
        people in customers(),
        stock in inventory(),
        config in config(),
    ) {
        let engine = TransformEngine::with_config(config.with_dedup_stage(DedupStage::AfterNormalization));
        for (dataset, table) in [
            (Dataset::BranchSales, branch),
            (Dataset::Customers, people),
            (Dataset::Inventory, stock),
        ] {
            let once = engine.clean(dataset, table).unwrap();
            let twice = engine.clean(dataset, once.table.clone()).unwrap();
            prop_assert_eq!(&twice.table, &once.table);
            prop_assert!(twice.result.is_clean());
        }
    }
}
