use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::date::{add_days, days_between};
use crate::model::{Plan, TaskKind};

/// Outcome of a propagation run. `converged` is false when the pass
/// budget ran out while dates were still moving, which happens exactly
/// when the dependency graph contains a cycle; the stored dates are then
/// a best effort, not a consistent schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationReport {
    pub converged: bool,
    pub passes: usize,
}

impl Plan {
    /// Enforce finish-to-start constraints: every dated task with
    /// predecessors must start at least one day after its latest
    /// predecessor ends. Tasks that shift keep their duration.
    ///
    /// Iterates to a fixed point, bounded at `3 * dated_tasks + 10`
    /// passes so cyclic graphs terminate. Undated tasks, groups and
    /// dangling predecessor ids take no part.
    pub fn propagate(&mut self) -> PropagationReport {
        let dated: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TaskKind::Task && t.is_dated())
            .map(|(i, _)| i)
            .collect();
        let by_id: HashMap<Uuid, usize> = dated.iter().map(|&i| (self.tasks[i].id, i)).collect();

        let max_passes = dated.len() * 3 + 10;
        let mut passes = 0;
        let mut converged = false;

        while passes < max_passes {
            passes += 1;
            let mut changed = false;

            for &i in &dated {
                if self.tasks[i].deps.is_empty() {
                    continue;
                }
                let min_start: Option<NaiveDate> = self.tasks[i]
                    .deps
                    .iter()
                    .filter_map(|dep| by_id.get(dep))
                    .filter_map(|&p| self.tasks[p].end)
                    .map(|end| add_days(end, 1))
                    .max();
                let Some(min_start) = min_start else { continue };

                let (Some(start), Some(end)) = (self.tasks[i].start, self.tasks[i].end) else {
                    continue;
                };
                if start < min_start {
                    let duration = days_between(start, end);
                    self.tasks[i].start = Some(min_start);
                    self.tasks[i].end = Some(add_days(min_start, duration));
                    changed = true;
                }
            }

            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!(
                "dependency propagation still moving after {passes} passes; the graph likely contains a cycle"
            );
        }
        PropagationReport { converged, passes }
    }

    /// Derive every group's range from its dated task descendants:
    /// earliest start to latest end, or unset when there are none.
    /// Collapse state is irrelevant here. Idempotent.
    pub fn rollup_groups(&mut self) {
        let group_ids: Vec<Uuid> = self
            .tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Group)
            .map(|t| t.id)
            .collect();

        for gid in group_ids {
            let mut range: Option<(NaiveDate, NaiveDate)> = None;
            for t in self.descendants_of(gid) {
                if t.kind != TaskKind::Task {
                    continue;
                }
                let (Some(s), Some(e)) = (t.start, t.end) else { continue };
                range = Some(match range {
                    None => (s, e),
                    Some((min, max)) => (min.min(s), max.max(e)),
                });
            }
            if let Some(g) = self.get_mut(gid) {
                match range {
                    Some((min, max)) => {
                        g.start = Some(min);
                        g.end = Some(max);
                    }
                    None => {
                        g.start = None;
                        g.end = None;
                    }
                }
            }
        }
    }

    /// Bring the plan back to a render-ready state after a mutation:
    /// propagate dependency constraints, then refresh group rollups.
    pub fn restabilize(&mut self) -> PropagationReport {
        let report = self.propagate();
        self.rollup_groups();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;

    fn day(n: i64) -> NaiveDate {
        add_days(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(), n)
    }

    fn task_in(plan: &mut Plan, parent: Option<Uuid>, name: &str, s: i64, e: i64) -> Uuid {
        let mut t = Task::new(TaskKind::Task, parent, day(0));
        t.name = name.to_string();
        t.start = Some(day(s));
        t.end = Some(day(e));
        plan.add(t)
    }

    fn range(plan: &Plan, id: Uuid) -> (NaiveDate, NaiveDate) {
        let t = plan.get(id).unwrap();
        (t.start.unwrap(), t.end.unwrap())
    }

    #[test]
    fn successor_shifts_keeping_duration() {
        let mut plan = Plan::new();
        let g = plan.add(Task::new(TaskKind::Group, None, day(0)));
        let a = task_in(&mut plan, Some(g), "A", 0, 2);
        let b = task_in(&mut plan, Some(g), "B", 3, 12);
        let c = task_in(&mut plan, Some(g), "C", 10, 15);
        plan.set_deps(b, vec![a]);
        plan.set_deps(c, vec![b]);

        // A and B already satisfy their constraints; C must start the day
        // after B ends, keeping its 5-day span.
        assert_eq!(range(&plan, a), (day(0), day(2)));
        assert_eq!(range(&plan, b), (day(3), day(12)));
        assert_eq!(range(&plan, c), (day(13), day(18)));
        assert_eq!(range(&plan, g), (day(0), day(18)));
    }

    #[test]
    fn propagation_reaches_fixed_point_once() {
        let mut plan = Plan::new();
        let a = task_in(&mut plan, None, "A", 0, 4);
        let b = task_in(&mut plan, None, "B", 0, 4);
        let c = task_in(&mut plan, None, "C", 0, 4);
        plan.set_deps(b, vec![a]);
        plan.set_deps(c, vec![b]);

        assert_eq!(range(&plan, b), (day(5), day(9)));
        assert_eq!(range(&plan, c), (day(10), day(14)));

        // Already stable: a second run changes nothing and settles in one
        // pass.
        let before = plan.clone();
        let report = plan.propagate();
        assert!(report.converged);
        assert_eq!(report.passes, 1);
        assert_eq!(plan, before);
    }

    #[test]
    fn latest_predecessor_wins() {
        let mut plan = Plan::new();
        let a = task_in(&mut plan, None, "A", 0, 2);
        let b = task_in(&mut plan, None, "B", 0, 8);
        let c = task_in(&mut plan, None, "C", 0, 3);
        plan.set_deps(c, vec![a, b]);

        assert_eq!(range(&plan, c), (day(9), day(12)));
    }

    #[test]
    fn undated_and_dangling_predecessors_are_ignored() {
        let mut plan = Plan::new();
        let a = task_in(&mut plan, None, "A", 0, 2);
        let b = task_in(&mut plan, None, "B", 1, 4);
        plan.set_deps(b, vec![a]);
        // Losing A's dates lifts the constraint without moving B back.
        plan.set_range(a, None, None);
        let before = range(&plan, b);
        let report = plan.restabilize();
        assert!(report.converged);
        assert_eq!(range(&plan, b), before);

        // A dangling id left in place (bypassing set_deps) is skipped too.
        plan.get_mut(b).unwrap().deps = vec![Uuid::new_v4()];
        assert!(plan.restabilize().converged);
        assert_eq!(range(&plan, b), before);
    }

    #[test]
    fn cycle_terminates_and_reports_non_convergence() {
        let mut plan = Plan::new();
        let a = task_in(&mut plan, None, "A", 0, 2);
        let b = task_in(&mut plan, None, "B", 3, 5);
        plan.get_mut(a).unwrap().deps = vec![b];
        plan.get_mut(b).unwrap().deps = vec![a];

        let report = plan.propagate();
        assert!(!report.converged);
        // Bound is 3 * dated tasks + 10.
        assert_eq!(report.passes, 16);
    }

    #[test]
    fn rollup_spans_nested_groups_and_clears_empty_ones() {
        let mut plan = Plan::new();
        let outer = plan.add(Task::new(TaskKind::Group, None, day(0)));
        let inner = plan.add(Task::new(TaskKind::Group, Some(outer), day(0)));
        task_in(&mut plan, Some(outer), "A", 2, 6);
        task_in(&mut plan, Some(inner), "B", 4, 11);
        let empty = plan.add(Task::new(TaskKind::Group, None, day(0)));

        plan.rollup_groups();
        assert_eq!(range(&plan, outer), (day(2), day(11)));
        assert_eq!(range(&plan, inner), (day(4), day(11)));
        let e = plan.get(empty).unwrap();
        assert_eq!((e.start, e.end), (None, None));

        // Idempotent.
        let before = plan.clone();
        plan.rollup_groups();
        assert_eq!(plan, before);
    }

    #[test]
    fn rollup_clears_group_after_losing_dated_descendants() {
        let mut plan = Plan::new();
        let g = plan.add(Task::new(TaskKind::Group, None, day(0)));
        let a = task_in(&mut plan, Some(g), "A", 1, 3);
        assert_eq!(range(&plan, g), (day(1), day(3)));

        plan.delete(a);
        let g_task = plan.get(g).unwrap();
        assert_eq!((g_task.start, g_task.end), (None, None));
    }

    #[test]
    fn deleting_a_predecessor_freezes_the_successor() {
        let mut plan = Plan::new();
        let a = task_in(&mut plan, None, "A", 0, 2);
        let b = task_in(&mut plan, None, "B", 3, 12);
        let c = task_in(&mut plan, None, "C", 10, 15);
        plan.set_deps(b, vec![a]);
        plan.set_deps(c, vec![b]);
        assert_eq!(range(&plan, c), (day(13), day(18)));

        // B's removal empties C's deps; C stays where propagation last
        // put it.
        plan.delete(b);
        assert!(plan.get(c).unwrap().deps.is_empty());
        assert_eq!(range(&plan, c), (day(13), day(18)));
    }
}
