//! Fuzz target for extraction followed by cleaning.
//!
//! Arbitrary bytes are written as a customer extract; extraction and cleaning
//! may fail with an error but must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sluice::{Dataset, Parser, TransformEngine};
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10_000 {
        return;
    }

    let Ok(mut file) = tempfile::NamedTempFile::with_suffix(".csv") else {
        return;
    };
    if file.write_all(b"customer_id,name,email,loyalty_status\n").is_err()
        || file.write_all(data).is_err()
    {
        return;
    }

    if let Ok((table, _)) = Parser::new().parse_dataset(Dataset::Customers, file.path()) {
        let _ = TransformEngine::new().clean(Dataset::Customers, table);
    }
});
