use std::path::Path;

use crate::model::Plan;

use super::snapshot;

/// Save a plan to a JSON snapshot file.
pub fn save_plan(plan: &Plan, path: &Path) -> Result<(), String> {
    let json = snapshot::to_string_pretty(plan)?;
    std::fs::write(path, json).map_err(|e| e.to_string())
}

/// Load a plan from a JSON snapshot file. The file must hold valid
/// JSON; any structural damage inside it is repaired by sanitization.
/// Callers restabilize before rendering.
pub fn load_plan(path: &Path) -> Result<Plan, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    snapshot::from_str(&text)
}
