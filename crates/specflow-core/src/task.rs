use crate::error::{Result, SpecflowError};
use crate::parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Complexity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// One checklist item from a tasks document, either a main task (`task-2`)
/// or a sub-task (`task-2.1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub requirements: Vec<String>,
    pub dependencies: Vec<String>,
    pub context_files: Vec<String>,
    pub parent_task_id: Option<String>,
    pub sub_tasks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub progress: u8,
    /// 1-based line of the checkbox in the source document.
    pub line: usize,
    /// Byte offset of the checkbox mark (the character between `[` and `]`).
    #[serde(skip)]
    pub(crate) checkbox_offset: usize,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed,
            requirements: Vec::new(),
            dependencies: Vec::new(),
            context_files: Vec::new(),
            parent_task_id: None,
            sub_tasks: Vec::new(),
            complexity: None,
            estimated_duration: None,
            notes: None,
            progress: if completed { 100 } else { 0 },
            line: 0,
            checkbox_offset: 0,
        }
    }

    pub fn is_sub_task(&self) -> bool {
        self.parent_task_id.is_some()
    }

    pub fn is_in_progress(&self) -> bool {
        !self.completed && self.progress > 0
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.progress = if completed { 100 } else { 0 };
    }
}

// ---------------------------------------------------------------------------
// Task list operations
// ---------------------------------------------------------------------------

pub fn find<'a>(tasks: &'a [Task], id: &str) -> Result<&'a Task> {
    tasks
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| SpecflowError::TaskNotFound(id.to_string()))
}

/// Flip one task's checkbox in the file at `path` and return the reparsed
/// task list.
///
/// Reads the whole document, replaces exactly one checkbox character and
/// writes the full content back atomically.
pub fn update_status(path: &Path, id: &str, completed: bool) -> Result<Vec<Task>> {
    let content = crate::io::read_text(path)?;
    let updated = parser::set_checkbox(&content, id, completed)
        .ok_or_else(|| SpecflowError::TaskNotFound(id.to_string()))?;
    if updated != content {
        crate::io::atomic_write(path, updated.as_bytes())?;
        tracing::info!(task = %id, completed, path = %path.display(), "updated task status");
    }
    Ok(parser::parse_tasks(&updated))
}

/// Human-readable summary: "3/5 completed, 1 available, 1 blocked"
pub fn summarize(tasks: &[Task]) -> String {
    let partition = crate::graph::TaskGraph::new(tasks).partition();
    format!(
        "{}/{} completed, {} available, {} blocked",
        partition.completed.len(),
        tasks.len(),
        partition.available.len(),
        partition.blocked.len()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
