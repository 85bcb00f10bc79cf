use std::collections::{HashMap, HashSet};

use serde_json::Value;
use uuid::Uuid;

use crate::date::{normalize_range, parse_key};
use crate::model::{Plan, Task, TaskKind, SNAPSHOT_VERSION};

/// Coerce an untrusted snapshot value into a well-formed plan. This is
/// the only entry point for loaded data: it never fails, applying one
/// default per field instead (fresh id, empty name/notes, task kind, no
/// parent, no dates, no deps, not collapsed). Unknown fields are
/// dropped, group dates are forced unset, task ranges are normalized.
pub fn sanitize(data: &Value) -> Plan {
    static EMPTY: Vec<Value> = Vec::new();
    let raw_tasks = data
        .get("tasks")
        .and_then(Value::as_array)
        .unwrap_or(&EMPTY);

    // First pass: settle every entity's id. Raw id strings that are not
    // UUIDs get a fresh one, remembered under their original spelling so
    // parentId/deps written with that spelling still connect. Duplicate
    // ids resolve to the first holder; later holders get fresh ids.
    let mut by_raw: HashMap<&str, Uuid> = HashMap::new();
    let mut used: HashSet<Uuid> = HashSet::new();
    let mut ids: Vec<Uuid> = Vec::with_capacity(raw_tasks.len());
    for raw in raw_tasks {
        let raw_id = raw.get("id").and_then(Value::as_str).unwrap_or("");
        let mut id = Uuid::parse_str(raw_id).unwrap_or_else(|_| Uuid::new_v4());
        while !used.insert(id) {
            id = Uuid::new_v4();
        }
        if !raw_id.is_empty() {
            by_raw.entry(raw_id).or_insert(id);
        }
        ids.push(id);
    }

    let resolve = |v: Option<&Value>| -> Option<Uuid> {
        let raw = v?.as_str()?;
        if raw.is_empty() {
            return None;
        }
        if let Some(&id) = by_raw.get(raw) {
            return Some(id);
        }
        // Unknown but well-formed ids are kept; dangling references are
        // tolerated downstream.
        Uuid::parse_str(raw).ok()
    };

    let mut tasks: Vec<Task> = Vec::with_capacity(raw_tasks.len());
    for (raw, id) in raw_tasks.iter().zip(ids) {
        let kind = match raw.get("type").and_then(Value::as_str) {
            Some("group") => TaskKind::Group,
            _ => TaskKind::Task,
        };

        let parent_id = resolve(raw.get("parentId")).filter(|p| *p != id);

        let date = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .and_then(parse_key)
        };
        let (start, end) = match kind {
            TaskKind::Task => normalize_range(date("start"), date("end")),
            TaskKind::Group => (None, None),
        };

        let mut seen = HashSet::new();
        let deps: Vec<Uuid> = raw
            .get("deps")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|d| resolve(Some(d)))
                    .filter(|d| *d != id && seen.insert(*d))
                    .collect()
            })
            .unwrap_or_default();

        tasks.push(Task {
            id,
            name: coerce_string(raw.get("name")),
            kind,
            parent_id,
            start,
            end,
            deps,
            notes: coerce_string(raw.get("notes")),
            collapsed: raw.get("collapsed").and_then(Value::as_bool).unwrap_or(false),
        });
    }

    Plan {
        version: SNAPSHOT_VERSION,
        tasks,
    }
}

/// Parse snapshot text. The text must be JSON; everything inside it is
/// repaired by [`sanitize`].
pub fn from_str(text: &str) -> Result<Plan, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    Ok(sanitize(&value))
}

/// Render a plan as pretty-printed snapshot JSON.
pub fn to_string_pretty(plan: &Plan) -> Result<String, String> {
    serde_json::to_string_pretty(plan).map_err(|e| e.to_string())
}

fn coerce_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
