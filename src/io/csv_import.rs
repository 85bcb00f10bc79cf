use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::date::normalize_range;
use crate::model::{Plan, Task, TaskKind};

/// Try parsing a date string with several common formats.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d", "%m-%d-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs {
        b';'
    } else if tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

/// Normalize a header string to a canonical column key.
fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase().replace([' ', '-', '_'], "")
}

/// Map a normalized header to our column index:
///   0 = name, 1 = start, 2 = end, 3 = type, 4 = parent, 5 = notes
fn header_to_col(normalized: &str) -> Option<usize> {
    match normalized {
        "name" | "task" | "tasklabel" | "taskname" | "label" | "title"
        | "activity" => Some(0),

        "start" | "startdate" | "from" | "begin" | "begindate" => Some(1),

        "end" | "enddate" | "to" | "finish" | "finishdate" | "due" | "duedate" => Some(2),

        "type" | "kind" | "rowtype" => Some(3),

        "parent" | "parentname" | "parenttask" | "group" | "subtaskof" => Some(4),

        "notes" | "note" | "description" | "details" | "comment" | "comments" => Some(5),

        _ => None,
    }
}

/// Import a plan from a CSV file.
///
/// Auto-detects delimiter (comma, semicolon, tab).
/// Matches column headers flexibly (e.g. "Task Label", "Start Date").
/// Rows typed `group` become groups; everything else becomes a task and
/// needs parseable start/end dates. Parents are resolved by group name
/// in a second pass. Dependencies are not carried by CSV; the JSON
/// snapshot is the full-fidelity format.
/// Returns `(plan, skipped_count)` on success.
pub fn import_csv(path: &Path) -> Result<(Plan, usize), String> {
    // Read the whole file to detect delimiter from the first line
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;

    let first_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    // Parse headers and map them to column indices
    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read CSV headers: {}", e))?
        .clone();

    let col_map: Vec<Option<usize>> = headers
        .iter()
        .map(|h| header_to_col(&normalize_header(h)))
        .collect();

    // Verify we have at least name, start, end
    let has_name = col_map.iter().any(|c| *c == Some(0));
    let has_start = col_map.iter().any(|c| *c == Some(1));
    let has_end = col_map.iter().any(|c| *c == Some(2));

    if !has_name || !has_start || !has_end {
        let found: Vec<&str> = headers.iter().collect();
        return Err(format!(
            "CSV is missing required columns. Found headers: {:?}. \
             Need columns for: name, start date, end date.",
            found
        ));
    }

    // Accumulate (task, optional parent name) pairs; resolve parent IDs
    // in a second pass.
    let mut tasks: Vec<Task> = Vec::new();
    let mut parent_names: Vec<Option<String>> = Vec::new();
    let mut skipped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping CSV row {}: {}", i + 2, e);
                skipped += 1;
                continue;
            }
        };

        let mut fields: [Option<&str>; 6] = [None; 6];
        for (col_idx, field) in record.iter().enumerate() {
            if let Some(Some(slot)) = col_map.get(col_idx) {
                fields[*slot] = Some(field.trim());
            }
        }

        let name = match fields[0] {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let kind = match fields[3] {
            Some(t) if t.to_lowercase().contains("group") => TaskKind::Group,
            _ => TaskKind::Task,
        };

        let (start, end) = if kind == TaskKind::Group {
            // Group dates are derived; whatever the file says is ignored.
            (None, None)
        } else {
            let start = fields[1].and_then(parse_date);
            let end = fields[2].and_then(parse_date);
            if start.is_none() || end.is_none() {
                log::warn!(
                    "skipping row {}: invalid dates '{}' / '{}'",
                    i + 2,
                    fields[1].unwrap_or(""),
                    fields[2].unwrap_or("")
                );
                skipped += 1;
                continue;
            }
            normalize_range(start, end)
        };

        // Store the raw parent name; resolve after all rows are loaded.
        parent_names.push(fields[4].filter(|s| !s.is_empty()).map(str::to_string));
        tasks.push(Task {
            id: Uuid::new_v4(),
            name,
            kind,
            parent_id: None,
            start,
            end,
            deps: Vec::new(),
            notes: fields[5].unwrap_or("").to_string(),
            collapsed: false,
        });
    }

    if tasks.is_empty() && skipped > 0 {
        return Err(format!("No valid rows found in CSV ({} rows skipped)", skipped));
    }
    if tasks.is_empty() {
        return Err("CSV file is empty or has no data rows".to_string());
    }

    // Second pass: resolve parent names against the imported groups.
    let name_to_group: HashMap<String, Uuid> = tasks
        .iter()
        .filter(|t| t.kind == TaskKind::Group)
        .map(|t| (t.name.to_lowercase(), t.id))
        .collect();

    for (task, parent_name) in tasks.iter_mut().zip(parent_names.iter()) {
        if let Some(pname) = parent_name {
            match name_to_group.get(&pname.to_lowercase()) {
                Some(&pid) if pid != task.id => task.parent_id = Some(pid),
                Some(_) => {}
                None => {
                    log::warn!("parent group '{}' not found for '{}'", pname, task.name);
                }
            }
        }
    }

    let mut plan = Plan::new();
    plan.tasks = tasks;
    plan.restabilize();
    Ok((plan, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn imports_flexible_headers_and_delimiters() {
        let (_dir, path) = write_csv(
            "Task Label;Start Date;End Date;Type;Parent;Notes\n\
             Release;;;group;;\n\
             Define scope;2024-06-03;2024-06-05;task;Release;kickoff\n\
             Build MVP;06/06/2024;15/06/2024;;Release;\n",
        );
        let (plan, skipped) = import_csv(&path).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(plan.len(), 3);

        let group = &plan.tasks[0];
        assert_eq!(group.kind, TaskKind::Group);
        let scope = &plan.tasks[1];
        assert_eq!(scope.parent_id, Some(group.id));
        assert_eq!(scope.notes, "kickoff");
        let build = &plan.tasks[2];
        assert_eq!(build.kind, TaskKind::Task);
        assert_eq!(
            build.start,
            Some(NaiveDate::from_ymd_opt(2024, 6, 6).unwrap())
        );

        // Group range rolled up from the imported children.
        assert_eq!(
            group.start,
            Some(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap())
        );
        assert_eq!(
            group.end,
            Some(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        );
    }

    #[test]
    fn skips_rows_with_bad_dates_or_missing_names() {
        let (_dir, path) = write_csv(
            "name,start,end\n\
             Good,2024-06-03,2024-06-04\n\
             ,2024-06-03,2024-06-04\n\
             Bad dates,junk,2024-06-04\n",
        );
        let (plan, skipped) = import_csv(&path).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(skipped, 2);
        assert_eq!(plan.tasks[0].name, "Good");
    }

    #[test]
    fn inverted_ranges_are_normalized() {
        let (_dir, path) = write_csv(
            "name,start,end\n\
             Flipped,2024-06-09,2024-06-03\n",
        );
        let (plan, _) = import_csv(&path).unwrap();
        let t = &plan.tasks[0];
        assert_eq!(t.start, Some(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()));
        assert_eq!(t.end, Some(NaiveDate::from_ymd_opt(2024, 6, 9).unwrap()));
    }

    #[test]
    fn rejects_files_without_required_columns() {
        let (_dir, path) = write_csv("foo,bar\n1,2\n");
        assert!(import_csv(&path).is_err());

        let (_dir2, path2) = write_csv("name,start,end\n");
        assert!(import_csv(&path2).is_err());
    }
}
