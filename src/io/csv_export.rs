use std::path::Path;

use chrono::NaiveDate;

use crate::model::{Plan, TaskKind};

fn format_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

/// Export a plan to a semicolon-delimited CSV file matching the import
/// format.
///
/// Columns: Name ; Type ; Start Date ; End Date ; Parent ; Notes
/// Dates are formatted as DD/MM/YYYY; undated cells stay empty.
/// Dependencies are not exported (the JSON snapshot carries them).
/// Returns the number of rows written.
pub fn export_csv(plan: &Plan, path: &Path) -> Result<usize, String> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_path(path)
        .map_err(|e| format!("Failed to create CSV file: {}", e))?;

    // Write header
    wtr.write_record(["Name", "Type", "Start Date", "End Date", "Parent", "Notes"])
        .map_err(|e| format!("Failed to write header: {}", e))?;

    // Write each row in plan order so reimport keeps sibling ordering
    for task in &plan.tasks {
        let kind = match task.kind {
            TaskKind::Task => "task",
            TaskKind::Group => "group",
        };
        let parent = task
            .parent_id
            .and_then(|p| plan.get(p))
            .map(|p| p.name.clone())
            .unwrap_or_default();
        wtr.write_record([
            task.name.as_str(),
            kind,
            &format_date(task.start),
            &format_date(task.end),
            &parent,
            &task.notes,
        ])
        .map_err(|e| format!("Failed to write row '{}': {}", task.name, e))?;
    }

    wtr.flush().map_err(|e| format!("Failed to flush CSV: {}", e))?;
    Ok(plan.len())
}
