//! End-to-end tests of the `sluice` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn sluice(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sluice"))
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to start sluice")
}

fn write_project(dir: &Path) {
    fs::write(
        dir.join("branch.csv"),
        "transaction_id,branch_id,timestamp,item_id,quantity,price\n\
         1,1,01/05/2023,4,2,2.5\n\
         2,1,not_a_date,4,1,2.5\n",
    )
    .unwrap();
    fs::write(
        dir.join("online.csv"),
        "transaction_id,customer_id,timestamp,item_id,quantity,price,delivery_address\n\
         9,1,01/06/2023,4,1,2.5,\n",
    )
    .unwrap();
    fs::write(
        dir.join("customers.csv"),
        "customer_id,name,email,loyalty_status\n1,Dee,DEE@SHOP.COM,Gold\n",
    )
    .unwrap();
    fs::write(
        dir.join("inventory.csv"),
        "item_id,branch_id,stock_level,reorder_level\n4,1,3,10\n",
    )
    .unwrap();
    fs::write(
        dir.join("sluice.toml"),
        r#"
[sources]
branch_sales = "branch.csv"
online_sales = "online.csv"
customers = "customers.csv"
inventory = "inventory.csv"

[destination]
kind = "csv"
path = "clean"
"#,
    )
    .unwrap();
}

#[test]
fn test_run_writes_tables_and_json_summary() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());

    let output = sluice(dir.path(), &["run", "--json", "--policy", "drop"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["results"]["branch_sales"]["rows_out"], 1);
    assert_eq!(summary["results"]["branch_sales"]["timestamp_failures"], 1);

    let customers = fs::read_to_string(dir.path().join("clean/customer_data.csv")).unwrap();
    assert!(customers.contains("dee@shop.com"));
}

#[test]
fn test_preview_leaves_destination_empty() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());

    let output = sluice(dir.path(), &["preview", "-n", "1"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("inventory_data"));
    assert!(!dir.path().join("clean").exists());
}

#[test]
fn test_plan_without_config() {
    let dir = TempDir::new().unwrap();
    let output = sluice(dir.path(), &["plan", "--json"]);
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["timestamp_policy"], "SUBSTITUTE_DEFAULT");
    assert!(plan["datasets"]["inventory_data"].as_array().unwrap().len() >= 3);
}

#[test]
fn test_missing_config_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let output = sluice(dir.path(), &["run"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config file not found"));
}

#[test]
fn test_log_file_receives_events() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());

    let output = sluice(dir.path(), &["run", "--log-file", "etl.log"]);
    assert!(output.status.success());
    let log = fs::read_to_string(dir.path().join("etl.log")).unwrap();
    assert!(log.contains("Unparseable timestamps"));
}
