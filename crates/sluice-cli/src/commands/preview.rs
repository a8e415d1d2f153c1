//! Preview command - clean without loading.

use colored::Colorize;
use sluice::{Pipeline, Table};

use crate::cli::PipelineArgs;

pub fn run(args: PipelineArgs, rows: usize, _verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(&args)?;
    let destination = config.destination.open().describe();
    let preview = Pipeline::new(config).preview()?;

    if args.json {
        let tables: serde_json::Map<String, serde_json::Value> = preview
            .tables
            .iter()
            .map(|(dataset, cleaned)| {
                let head = Table::new(
                    cleaned.table.columns.clone(),
                    cleaned.table.rows.iter().take(rows).cloned().collect(),
                );
                Ok((dataset.table_name().to_string(), serde_json::to_value(head)?))
            })
            .collect::<Result<_, serde_json::Error>>()?;
        let output = serde_json::json!({
            "summary": preview.summary,
            "tables": tables,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Preview for".cyan().bold(),
        destination.white()
    );
    println!("{}", "Nothing is written.".dimmed());
    println!();

    if rows > 0 {
        for (dataset, cleaned) in preview.tables.iter() {
            println!("{}", dataset.table_name().yellow().bold());
            print_head(&cleaned.table, rows);
            println!();
        }
    }

    super::print_summary(&preview.summary);
    Ok(())
}

fn print_head(table: &Table, rows: usize) {
    println!("  {}", table.columns.join(" | ").white().bold());
    for row in table.rows.iter().take(rows) {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("  {}", cells.join(" | "));
    }
    if table.row_count() > rows {
        println!("  {}", format!("... {} more rows", table.row_count() - rows).dimmed());
    }
}
