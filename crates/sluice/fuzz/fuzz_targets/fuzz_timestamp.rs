//! Fuzz target for timestamp formats and timestamp normalization.
//!
//! Checks that:
//! 1. Arbitrary format patterns are rejected cleanly or accepted
//! 2. Parsing never panics on any raw value
//! 3. Cleaning a sales table never panics and always yields timestamps

#![no_main]

use libfuzzer_sys::fuzz_target;
use sluice::{CleaningConfig, Dataset, Table, TimestampFormat, TransformEngine, Value};

fuzz_target!(|data: &[u8]| {
    if data.len() > 4_096 {
        return;
    }
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    // First line is the format, the rest are raw values.
    let mut lines = content.lines();
    let pattern = lines.next().unwrap_or_default();
    let format = TimestampFormat::new(pattern).unwrap_or_default();

    let mut table = Table::with_columns(["transaction_id", "timestamp", "quantity", "price"]);
    for (idx, raw) in lines.enumerate() {
        let _ = format.parse(raw);
        table.push_row(vec![
            Value::Integer(idx as i64),
            Value::from(raw),
            Value::Float(1.0),
            Value::Null,
        ]);
    }

    let engine = TransformEngine::with_config(CleaningConfig::default().with_timestamp_format(format));
    let cleaned = engine
        .clean(Dataset::BranchSales, table)
        .expect("well-formed sales table must clean");
    let ts = cleaned.table.column_index("timestamp").expect("timestamp column");
    assert!(cleaned.table.column_values(ts).all(|v| v.as_timestamp().is_some()));
});
