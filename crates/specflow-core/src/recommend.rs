use crate::graph::TaskGraph;
use crate::task::Task;
use std::cmp::Reverse;

/// Pick the task to suggest next from the currently available set.
///
/// Greedy ordering, first wins on ties (stable sort):
/// 1. sub-tasks before top-level tasks
/// 2. fewer explicit dependencies
/// 3. more tasks unblocked by finishing it
///
/// This is a local heuristic. It does not search for the globally best
/// unblocking order.
pub fn next_recommended_task(tasks: &[Task]) -> Option<&Task> {
    let graph = TaskGraph::new(tasks);
    let mut candidates: Vec<(&Task, usize)> = graph
        .partition()
        .available
        .into_iter()
        .map(|t| (t, graph.enables(&t.id).len()))
        .collect();

    candidates.sort_by_key(|(t, enables)| {
        (!t.is_sub_task(), t.dependencies.len(), Reverse(*enables))
    });
    candidates.first().map(|(t, _)| *t)
}
