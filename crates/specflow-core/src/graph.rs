use crate::task::Task;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyStatus {
    pub task_id: String,
    pub can_execute: bool,
    /// Dependencies that are not completed, including ids that match no task.
    pub blocked_by: Vec<String>,
    /// Tasks that list this task as a dependency.
    pub enables: Vec<String>,
}

/// Status partition of a task list. `completed`, `available` and `blocked`
/// are disjoint; `in_progress` is informational and may overlap the others.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusPartition<'a> {
    pub completed: Vec<&'a Task>,
    pub available: Vec<&'a Task>,
    pub blocked: Vec<&'a Task>,
    pub in_progress: Vec<&'a Task>,
}

// ---------------------------------------------------------------------------
// TaskGraph
// ---------------------------------------------------------------------------

/// Read-only view over a parsed task list.
///
/// Nothing is cached: every query reflects the slice it was built from.
pub struct TaskGraph<'a> {
    tasks: &'a [Task],
    by_id: HashMap<&'a str, &'a Task>,
}

impl<'a> TaskGraph<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let by_id = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        Self { tasks, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a Task> {
        self.by_id.get(id).copied()
    }

    fn is_satisfied(&self, dep: &str) -> bool {
        self.get(dep).map(|t| t.completed).unwrap_or(false)
    }

    /// A task can run when every listed dependency exists and is completed.
    /// The parent relationship alone never blocks a sub-task.
    pub fn can_execute(&self, task: &Task) -> bool {
        task.dependencies.iter().all(|d| self.is_satisfied(d))
    }

    pub fn blocked_by(&self, task: &Task) -> Vec<String> {
        task.dependencies
            .iter()
            .filter(|d| !self.is_satisfied(d))
            .cloned()
            .collect()
    }

    pub fn enables(&self, id: &str) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| t.id != id && t.dependencies.iter().any(|d| d == id))
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn dependency_status(&self, id: &str) -> Option<DependencyStatus> {
        let task = self.get(id)?;
        Some(DependencyStatus {
            task_id: task.id.clone(),
            can_execute: self.can_execute(task),
            blocked_by: self.blocked_by(task),
            enables: self.enables(id),
        })
    }

    pub fn partition(&self) -> StatusPartition<'a> {
        let mut out = StatusPartition::default();
        for task in self.tasks {
            if task.completed {
                out.completed.push(task);
                continue;
            }
            if self.can_execute(task) {
                out.available.push(task);
            } else {
                out.blocked.push(task);
            }
            if task.is_in_progress() {
                out.in_progress.push(task);
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// `(task id, dependency)` pairs whose dependency matches no task.
    pub fn unknown_dependencies(&self) -> Vec<(String, String)> {
        self.tasks
            .iter()
            .flat_map(|t| {
                t.dependencies
                    .iter()
                    .filter(|d| !self.by_id.contains_key(d.as_str()))
                    .map(move |d| (t.id.clone(), d.clone()))
            })
            .collect()
    }

    /// Dependency cycles, each reported once as the list of ids along it.
    pub fn dependency_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut done: HashSet<&str> = HashSet::new();
        for task in self.tasks {
            if !done.contains(task.id.as_str()) {
                let mut stack = Vec::new();
                self.visit(task, &mut stack, &mut done, &mut cycles);
            }
        }
        cycles
    }

    fn visit(
        &self,
        task: &'a Task,
        stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        if let Some(pos) = stack.iter().position(|id| *id == task.id) {
            cycles.push(stack[pos..].iter().map(|s| s.to_string()).collect());
            return;
        }
        if done.contains(task.id.as_str()) {
            return;
        }
        stack.push(task.id.as_str());
        for dep in &task.dependencies {
            if let Some(next) = self.get(dep) {
                self.visit(next, stack, done, cycles);
            }
        }
        stack.pop();
        done.insert(task.id.as_str());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_tasks;

    const EXAMPLE: &str = "\
- [x] 1. Set up structure
- [ ] 2. Build feature
- [ ] 2.1 Sub-part A
  - _Depends on: task-1_
- [ ] 2.2 Sub-part B
  - _Depends on: task-2.1_
";

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn example_partitions() {
        let tasks = parse_tasks(EXAMPLE);
        let graph = TaskGraph::new(&tasks);
        let p = graph.partition();
        assert_eq!(ids(&p.completed), ["task-1"]);
        assert_eq!(ids(&p.available), ["task-2", "task-2.1"]);
        assert_eq!(ids(&p.blocked), ["task-2.2"]);
        assert!(p.in_progress.is_empty());
    }

    #[test]
    fn incomplete_parent_does_not_block_sub_task() {
        let tasks = parse_tasks("- [ ] 1. Parent\n- [ ] 1.1 Child\n");
        let graph = TaskGraph::new(&tasks);
        assert!(graph.can_execute(&tasks[1]));
    }

    #[test]
    fn dependency_closure() {
        let doc = "\
- [x] 1. A
- [ ] 2. B
- [ ] 3. T
  - _Depends on: task-1, task-2_
";
        let mut tasks = parse_tasks(doc);
        {
            let graph = TaskGraph::new(&tasks);
            assert_eq!(ids(&graph.partition().blocked), ["task-3"]);
        }
        tasks[1].set_completed(true);
        let graph = TaskGraph::new(&tasks);
        assert_eq!(ids(&graph.partition().available), ["task-3"]);
    }

    #[test]
    fn missing_dependency_blocks() {
        let tasks = parse_tasks("- [ ] 1. T\n  - _Depends on: task-42_\n");
        let graph = TaskGraph::new(&tasks);
        let p = graph.partition();
        assert!(p.available.is_empty());
        assert_eq!(ids(&p.blocked), ["task-1"]);
        let status = graph.dependency_status("task-1").unwrap();
        assert!(!status.can_execute);
        assert_eq!(status.blocked_by, ["task-42"]);
        assert_eq!(
            graph.unknown_dependencies(),
            [("task-1".to_string(), "task-42".to_string())]
        );
    }

    #[test]
    fn forward_references_resolve() {
        let doc = "- [ ] 1. Later\n  - _Depends on: task-2_\n- [x] 2. Earlier work\n";
        let tasks = parse_tasks(doc);
        let graph = TaskGraph::new(&tasks);
        assert!(graph.can_execute(&tasks[0]));
    }

    #[test]
    fn dependency_status_reports_reverse_edges() {
        let tasks = parse_tasks(EXAMPLE);
        let graph = TaskGraph::new(&tasks);
        let status = graph.dependency_status("task-1").unwrap();
        assert!(status.can_execute);
        assert!(status.blocked_by.is_empty());
        assert_eq!(status.enables, ["task-2.1"]);

        let status = graph.dependency_status("task-2.2").unwrap();
        assert_eq!(status.blocked_by, ["task-2.1"]);
        assert!(status.enables.is_empty());

        assert!(graph.dependency_status("task-9").is_none());
    }

    #[test]
    fn in_progress_overlaps_other_sets() {
        let mut tasks = parse_tasks("- [ ] 1. Half done\n");
        tasks[0].progress = 50;
        let graph = TaskGraph::new(&tasks);
        let p = graph.partition();
        assert_eq!(ids(&p.available), ["task-1"]);
        assert_eq!(ids(&p.in_progress), ["task-1"]);
    }

    #[test]
    fn detects_cycles() {
        let doc = "\
- [ ] 1. A
  - _Depends on: task-2_
- [ ] 2. B
  - _Depends on: task-1_
- [ ] 3. C
";
        let tasks = parse_tasks(doc);
        let graph = TaskGraph::new(&tasks);
        assert_eq!(graph.dependency_cycles(), [vec!["task-1", "task-2"]]);
        assert!(TaskGraph::new(&parse_tasks(EXAMPLE))
            .dependency_cycles()
            .is_empty());
    }
}
