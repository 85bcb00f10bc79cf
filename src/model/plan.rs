use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date::{add_days, normalize_range};

use super::task::{Task, TaskKind};

/// Snapshot schema version written by [`Plan`] serialization.
pub const SNAPSHOT_VERSION: u32 = 2;

/// The in-memory task graph: every task and group of a plan, in insertion
/// order. Sibling ordering follows `tasks` order and survives edits and
/// reloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub version: u32,
    pub tasks: Vec<Task>,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            tasks: Vec::new(),
        }
    }
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starter plan shown on first launch: one group with three dependent
    /// tasks spanning roughly two weeks from `today`.
    pub fn seed(today: NaiveDate) -> Self {
        let mut plan = Self::new();

        let mut release = Task::new(TaskKind::Group, None, today);
        release.name = "Release v1".to_string();
        let gid = release.id;

        let mut scope = Task::new(TaskKind::Task, Some(gid), today);
        scope.name = "Define scope".to_string();
        scope.end = Some(add_days(today, 2));

        let mut build = Task::new(TaskKind::Task, Some(gid), today);
        build.name = "Build MVP".to_string();
        build.start = Some(add_days(today, 3));
        build.end = Some(add_days(today, 12));
        build.deps = vec![scope.id];

        let mut test = Task::new(TaskKind::Task, Some(gid), today);
        test.name = "Test & polish".to_string();
        test.start = Some(add_days(today, 10));
        test.end = Some(add_days(today, 15));
        test.deps = vec![build.id];

        plan.tasks = vec![release, scope, build, test];
        plan.restabilize();
        plan
    }

    // --- Lookup ---

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Default parent for newly added tasks.
    pub fn first_group_id(&self) -> Option<Uuid> {
        self.tasks
            .iter()
            .find(|t| t.kind == TaskKind::Group)
            .map(|t| t.id)
    }

    // --- Hierarchy ---

    /// Direct children of `id`, in insertion order.
    pub fn children_of(&self, id: Uuid) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.parent_id == Some(id))
            .collect()
    }

    /// Entities without a parent, in insertion order.
    pub fn roots(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.parent_id.is_none()).collect()
    }

    /// Every transitive child of `id`, regardless of collapse state.
    /// Rollup and deletion always see the full subtree.
    pub fn descendants_of(&self, id: Uuid) -> Vec<&Task> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            for child in self.children_of(cur) {
                if seen.insert(child.id) {
                    out.push(child);
                    stack.push(child.id);
                }
            }
        }
        out
    }

    /// Depth-first pre-order over the forest, insertion order at each
    /// level. A collapsed group contributes itself but none of its
    /// descendants. Rebuilt from scratch on every call; there is no
    /// incremental index to invalidate.
    pub fn visit_order(&self) -> Vec<(&Task, usize)> {
        fn walk<'a>(
            plan: &'a Plan,
            node: &'a Task,
            depth: usize,
            seen: &mut HashSet<Uuid>,
            order: &mut Vec<(&'a Task, usize)>,
        ) {
            if !seen.insert(node.id) {
                return;
            }
            order.push((node, depth));
            if node.kind == TaskKind::Group && node.collapsed {
                return;
            }
            for child in plan.children_of(node.id) {
                walk(plan, child, depth + 1, seen, order);
            }
        }

        let mut order = Vec::with_capacity(self.tasks.len());
        let mut seen = HashSet::new();
        for root in self.tasks.iter().filter(|t| t.parent_id.is_none()) {
            walk(self, root, 0, &mut seen, &mut order);
        }
        order
    }

    // --- Mutation ---

    /// Append an entity. A parent reference that does not resolve to an
    /// existing group is cleared rather than kept dangling.
    pub fn add(&mut self, mut task: Task) -> Uuid {
        if let Some(pid) = task.parent_id {
            let parent_ok = self.get(pid).is_some_and(|p| p.kind == TaskKind::Group);
            if !parent_ok {
                task.parent_id = None;
            }
        }
        let id = task.id;
        self.tasks.push(task);
        self.restabilize();
        id
    }

    /// Append a new task, parented under the first group when one exists.
    pub fn add_task(&mut self, today: NaiveDate) -> Uuid {
        let parent = self.first_group_id();
        self.add(Task::new(TaskKind::Task, parent, today))
    }

    /// Append a new top-level group.
    pub fn add_group(&mut self, today: NaiveDate) -> Uuid {
        self.add(Task::new(TaskKind::Group, None, today))
    }

    /// Remove an entity. Deleting a group removes its whole subtree.
    /// Afterwards every surviving entity's `deps` is pruned against the
    /// remaining population, so no dangling predecessor ids are left.
    pub fn delete(&mut self, id: Uuid) {
        let Some(task) = self.get(id) else { return };

        let mut doomed: HashSet<Uuid> = HashSet::from([id]);
        if task.kind == TaskKind::Group {
            doomed.extend(self.descendants_of(id).iter().map(|t| t.id));
        }
        self.tasks.retain(|t| !doomed.contains(&t.id));

        let alive: HashSet<Uuid> = self.tasks.iter().map(|t| t.id).collect();
        for t in &mut self.tasks {
            t.deps.retain(|d| alive.contains(d));
        }
        self.restabilize();
    }

    pub fn rename(&mut self, id: Uuid, name: impl Into<String>) {
        if let Some(t) = self.get_mut(id) {
            t.name = name.into();
        }
    }

    pub fn set_notes(&mut self, id: Uuid, notes: impl Into<String>) {
        if let Some(t) = self.get_mut(id) {
            t.notes = notes.into();
        }
    }

    /// Author a task's date range. Inverted ranges are swapped; a lone
    /// start collapses to a single-day range. Group dates stay derived,
    /// so for groups this only re-runs the rollup.
    pub fn set_range(&mut self, id: Uuid, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        let Some(task) = self.get_mut(id) else { return };
        match task.kind {
            TaskKind::Task => {
                let (s, e) = normalize_range(start, end);
                task.start = s;
                task.end = match (s, e) {
                    (Some(s), None) => Some(s),
                    _ => e,
                };
            }
            TaskKind::Group => {
                task.start = None;
                task.end = None;
            }
        }
        self.restabilize();
    }

    /// Replace a task's predecessor set. Ids that are unknown, non-task,
    /// duplicated or the entity itself are discarded.
    pub fn set_deps(&mut self, id: Uuid, deps: Vec<Uuid>) {
        let mut seen = HashSet::new();
        let valid: Vec<Uuid> = deps
            .into_iter()
            .filter(|d| {
                *d != id
                    && seen.insert(*d)
                    && self.get(*d).is_some_and(|t| t.kind == TaskKind::Task)
            })
            .collect();
        if let Some(t) = self.get_mut(id) {
            t.deps = valid;
            self.restabilize();
        }
    }

    /// Reparent an entity. Returns `false` without touching the plan when
    /// the move would break the forest: unknown ids, a non-group parent,
    /// the entity itself, or one of its own descendants.
    pub fn set_parent(&mut self, id: Uuid, parent: Option<Uuid>) -> bool {
        if !self.contains(id) {
            return false;
        }
        if let Some(pid) = parent {
            if pid == id {
                return false;
            }
            let Some(p) = self.get(pid) else { return false };
            if p.kind != TaskKind::Group {
                return false;
            }
            if self.descendants_of(id).iter().any(|t| t.id == pid) {
                return false;
            }
        }
        if let Some(t) = self.get_mut(id) {
            t.parent_id = parent;
        }
        self.restabilize();
        true
    }

    /// Flip an entity between task and group. Becoming a group hands the
    /// dates over to the rollup; becoming a task keeps whatever range the
    /// entity last displayed.
    pub fn set_kind(&mut self, id: Uuid, kind: TaskKind) {
        let Some(task) = self.get_mut(id) else { return };
        if task.kind == kind {
            return;
        }
        task.kind = kind;
        match kind {
            TaskKind::Group => {
                task.start = None;
                task.end = None;
            }
            TaskKind::Task => {
                if let (Some(s), None) = (task.start, task.end) {
                    task.end = Some(s);
                }
            }
        }
        self.restabilize();
    }

    pub fn toggle_collapsed(&mut self, id: Uuid) {
        if let Some(t) = self.get_mut(id) {
            t.collapsed = !t.collapsed;
        }
    }

    // --- Choice sets for form hosts ---

    /// Groups that `id` may be parented under: all groups except itself
    /// and its own descendants. Picking only from this set keeps the
    /// parent relation a forest.
    pub fn valid_parents(&self, id: Uuid) -> Vec<&Task> {
        let mut forbidden: HashSet<Uuid> = HashSet::from([id]);
        forbidden.extend(self.descendants_of(id).iter().map(|t| t.id));
        self.tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Group && !forbidden.contains(&t.id))
            .collect()
    }

    /// Tasks that `id` may depend on: every task except itself.
    pub fn valid_predecessors(&self, id: Uuid) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Task && t.id != id)
            .collect()
    }
}
