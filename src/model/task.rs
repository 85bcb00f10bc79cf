use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminates plain tasks from groups. Groups carry no authored dates;
/// their range is rolled up from descendant tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Task,
    Group,
}

/// A single row of the plan: either a schedulable task or a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Owning group, if any. Never the entity itself or one of its
    /// descendants.
    #[serde(rename = "parentId")]
    pub parent_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Finish-to-start predecessors (task ids).
    pub deps: Vec<Uuid>,
    pub notes: String,
    /// Groups only: hides the subtree from the visit order.
    pub collapsed: bool,
}

impl Task {
    /// Create a new entity with kind-dependent defaults: tasks span a
    /// single day (`today`), groups are undated until rollup.
    pub fn new(kind: TaskKind, parent_id: Option<Uuid>, today: NaiveDate) -> Self {
        let dated = kind == TaskKind::Task;
        Self {
            id: Uuid::new_v4(),
            name: match kind {
                TaskKind::Group => "New Group".to_string(),
                TaskKind::Task => "New Task".to_string(),
            },
            kind,
            parent_id,
            start: dated.then_some(today),
            end: dated.then_some(today),
            deps: Vec::new(),
            notes: String::new(),
            collapsed: false,
        }
    }

    /// True when both endpoints are set.
    pub fn is_dated(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}
