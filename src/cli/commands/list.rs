//! List command implementation.

use crate::cli::commands::Workspace;
use crate::error::Result;
use crate::export::list_rows;
use crate::model::ItemRow;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct ListOutput<'a> {
    home: String,
    count: usize,
    items: &'a [ItemRow],
}

/// Print every exportable item as a tree.
///
/// # Errors
///
/// Returns an error if the home directory is missing or cannot be read.
pub fn execute(workspace: &Workspace, json: bool) -> Result<()> {
    let hierarchy = workspace.hierarchy()?;
    let rows = list_rows(&hierarchy)?;

    if json {
        let output = ListOutput {
            home: workspace.home.display().to_string(),
            count: rows.len(),
            items: &rows,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if rows.is_empty() {
        println!("No items found under {}", workspace.home.display());
    } else {
        println!("Items ({} found):", rows.len());
        println!();
        for row in &rows {
            print_row(row);
        }
    }

    Ok(())
}

fn print_row(row: &ItemRow) {
    let indent = "  ".repeat(row.depth());
    let icon = if row.is_container { "▸" } else { "•" };
    let name = if row.is_container {
        row.leaf_name().bold().to_string()
    } else {
        row.leaf_name().to_string()
    };
    let kind = format!("[{}]", row.kind_label).dimmed();

    if row.synthetic {
        println!("{indent}{icon} {name} {kind} {}", "(path only)".dimmed());
    } else {
        println!("{indent}{icon} {name} {kind}");
    }
}
