//! Line-oriented parser for checklist task documents.
//!
//! ```text
//! - [x] 1. Set up structure
//! - [ ] 2. Build feature
//! - [ ] 2.1 Sub-part A
//!   - _Requirements: 1.1, 2.3_
//!   - _Depends on: task-1_
//!   - _Context: src/lib.rs_
//! ```
//!
//! Each line is classified on its own, then a small state machine folds the
//! classified lines into task records. Parsing never fails: lines that do
//! not fit the grammar are skipped.

use crate::task::Task;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

fn main_task_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*- \[([ xX])\]\s+(\d+)\.\s+(\S.*?)\s*$").unwrap())
}

fn sub_task_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*- \[([ xX])\]\s+(\d+)\.(\d+)\.?\s+(\S.*?)\s*$").unwrap()
    })
}

fn checkbox_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*- \[[ xX]\]").unwrap())
}

fn annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*]\s+)?_(?i:(requirements|depends on|context)):\s*(.*?)_\s*$")
            .unwrap()
    })
}

fn bare_task_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)?$").unwrap())
}

/// A metadata annotation following a task line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Requirements(Vec<String>),
    DependsOn(Vec<String>),
    Context(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    MainTask {
        completed: bool,
        number: &'a str,
        title: &'a str,
        /// Byte offset of the checkbox mark within the line.
        mark: usize,
    },
    SubTask {
        completed: bool,
        major: &'a str,
        minor: &'a str,
        title: &'a str,
        mark: usize,
    },
    Annotation(Annotation),
    /// A checkbox line that does not carry a task number.
    Checkbox,
    Blank,
    Other,
}

/// Returns true if the line is any `- [ ]` / `- [x]` item, numbered or not.
pub fn is_checkbox_line(line: &str) -> bool {
    checkbox_re().is_match(line)
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }

    if let Some(caps) = sub_task_re().captures(line) {
        if let (Some(mark), Some(major), Some(minor), Some(title)) =
            (caps.get(1), caps.get(2), caps.get(3), caps.get(4))
        {
            return LineKind::SubTask {
                completed: mark.as_str() != " ",
                major: major.as_str(),
                minor: minor.as_str(),
                title: title.as_str(),
                mark: mark.start(),
            };
        }
    }

    if let Some(caps) = main_task_re().captures(line) {
        if let (Some(mark), Some(number), Some(title)) = (caps.get(1), caps.get(2), caps.get(3)) {
            return LineKind::MainTask {
                completed: mark.as_str() != " ",
                number: number.as_str(),
                title: title.as_str(),
                mark: mark.start(),
            };
        }
    }

    if is_checkbox_line(line) {
        return LineKind::Checkbox;
    }

    if let Some(caps) = annotation_re().captures(line) {
        let key = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let items = split_list(caps.get(2).map(|m| m.as_str()).unwrap_or(""));
        match key.as_deref() {
            Some("requirements") => return LineKind::Annotation(Annotation::Requirements(items)),
            Some("depends on") => {
                let deps = items.into_iter().map(normalize_task_ref).collect();
                return LineKind::Annotation(Annotation::DependsOn(deps));
            }
            Some("context") => return LineKind::Annotation(Annotation::Context(items)),
            _ => {}
        }
    }

    LineKind::Other
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `2.1` and `task-2.1` both name the same task.
fn normalize_task_ref(item: String) -> String {
    if bare_task_number_re().is_match(&item) {
        format!("task-{item}")
    } else {
        item
    }
}

// ---------------------------------------------------------------------------
// Parse state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Between tasks: annotations are ignored.
    TopLevel,
    /// Just after a task line: annotations attach to the last task.
    AwaitingMetadata,
}

struct SourceLine<'a> {
    number: usize,
    start: usize,
    text: &'a str,
}

struct ParseState {
    mode: Mode,
    /// Index of the most recent main task in `tasks`.
    current_parent: Option<usize>,
    tasks: Vec<Task>,
    seen: HashSet<String>,
}

impl ParseState {
    fn new() -> Self {
        Self {
            mode: Mode::TopLevel,
            current_parent: None,
            tasks: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn step(mut self, line: SourceLine<'_>) -> Self {
        match classify_line(line.text) {
            LineKind::MainTask {
                completed,
                number,
                title,
                mark,
            } => {
                let id = format!("task-{number}");
                if !self.seen.insert(id.clone()) {
                    tracing::debug!(task = %id, line = line.number, "ignoring duplicate task id");
                    self.mode = Mode::TopLevel;
                    return self;
                }
                self.push(Task::new(id, title, completed), &line, mark);
                self.current_parent = Some(self.tasks.len() - 1);
                self.mode = Mode::AwaitingMetadata;
            }
            LineKind::SubTask {
                completed,
                major,
                minor,
                title,
                mark,
            } => {
                let Some(parent_idx) = self.current_parent else {
                    tracing::debug!(line = line.number, "dropping sub-task with no parent task");
                    self.mode = Mode::TopLevel;
                    return self;
                };
                let id = format!("task-{major}.{minor}");
                if !self.seen.insert(id.clone()) {
                    tracing::debug!(task = %id, line = line.number, "ignoring duplicate task id");
                    self.mode = Mode::TopLevel;
                    return self;
                }
                let mut task = Task::new(id.clone(), title, completed);
                task.parent_task_id = Some(self.tasks[parent_idx].id.clone());
                self.tasks[parent_idx].sub_tasks.push(id);
                self.push(task, &line, mark);
                self.mode = Mode::AwaitingMetadata;
            }
            LineKind::Annotation(annotation) => {
                if self.mode == Mode::AwaitingMetadata {
                    if let Some(task) = self.tasks.last_mut() {
                        apply_annotation(task, annotation);
                    }
                }
            }
            LineKind::Checkbox | LineKind::Blank => self.mode = Mode::TopLevel,
            LineKind::Other => {}
        }
        self
    }

    fn push(&mut self, mut task: Task, line: &SourceLine<'_>, mark: usize) {
        task.line = line.number;
        task.checkbox_offset = line.start + mark;
        self.tasks.push(task);
    }
}

fn apply_annotation(task: &mut Task, annotation: Annotation) {
    match annotation {
        Annotation::Requirements(items) => task.requirements.extend(items),
        Annotation::DependsOn(items) => task.dependencies.extend(items),
        Annotation::Context(items) => task.context_files.extend(items),
    }
}

fn source_lines(content: &str) -> impl Iterator<Item = SourceLine<'_>> {
    let mut offset = 0;
    content
        .split_inclusive('\n')
        .enumerate()
        .map(move |(i, raw)| {
            let start = offset;
            offset += raw.len();
            SourceLine {
                number: i + 1,
                start,
                text: raw.trim_end_matches(['\n', '\r']),
            }
        })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a tasks document into records in document order.
pub fn parse_tasks(content: &str) -> Vec<Task> {
    source_lines(content)
        .fold(ParseState::new(), ParseState::step)
        .tasks
}

/// Read and parse the tasks document at `path`.
///
/// A missing or unreadable file yields an empty list. Invalid UTF-8 is
/// decoded lossily so the rest of the document still parses.
pub fn parse_tasks_file(path: &Path) -> Vec<Task> {
    match crate::io::read_optional_lossy(path) {
        Ok(Some(content)) => parse_tasks(&content),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "tasks file unreadable");
            Vec::new()
        }
    }
}

/// Return `content` with the checkbox of `task_id` set to `completed`.
///
/// Only the single mark byte changes. Returns `None` if the task is not in
/// the document.
pub fn set_checkbox(content: &str, task_id: &str, completed: bool) -> Option<String> {
    let task = parse_tasks(content).into_iter().find(|t| t.id == task_id)?;
    let mut updated = content.to_string();
    if task.completed != completed {
        let mark = if completed { "x" } else { " " };
        let at = task.checkbox_offset;
        updated.replace_range(at..at + 1, mark);
    }
    Some(updated)
}

/// Count `- [ ]` / `- [x]` lines regardless of numbering.
pub fn count_checkboxes(content: &str) -> usize {
    content.lines().filter(|l| is_checkbox_line(l)).count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "\
- [x] 1. Set up structure
- [ ] 2. Build feature
- [ ] 2.1 Sub-part A
  - _Depends on: task-1_
- [ ] 2.2 Sub-part B
  - _Depends on: task-2.1_
";

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn parses_example_document() {
        let tasks = parse_tasks(EXAMPLE);
        assert_eq!(ids(&tasks), ["task-1", "task-2", "task-2.1", "task-2.2"]);
        assert!(tasks[0].completed);
        assert_eq!(tasks[0].progress, 100);
        assert!(!tasks[1].completed);
        assert_eq!(tasks[1].title, "Build feature");
        assert_eq!(tasks[1].sub_tasks, ["task-2.1", "task-2.2"]);
        assert_eq!(tasks[2].parent_task_id.as_deref(), Some("task-2"));
        assert_eq!(tasks[2].dependencies, ["task-1"]);
        assert_eq!(tasks[3].dependencies, ["task-2.1"]);
        assert_eq!(tasks[3].line, 5);
    }

    #[test]
    fn counts_main_and_sub_tasks() {
        let doc = "\
# Implementation Plan

- [ ] 1. One
- [ ] 1.1 One A
- [ ] 1.2 One B
- [ ] 2. Two
- [ ] 3. Three
- [ ] 3.1 Three A
";
        let tasks = parse_tasks(doc);
        assert_eq!(tasks.len(), 6);
        let main: Vec<_> = tasks.iter().filter(|t| !t.is_sub_task()).collect();
        assert_eq!(main.len(), 3);
        assert_eq!(main[0].sub_tasks, ["task-1.1", "task-1.2"]);
        assert!(main[1].sub_tasks.is_empty());
        assert_eq!(main[2].sub_tasks, ["task-3.1"]);
        for sub in tasks.iter().filter(|t| t.is_sub_task()) {
            let parent = sub.parent_task_id.as_deref().unwrap();
            let number = sub.id.trim_start_matches("task-").split('.').next().unwrap();
            assert_eq!(parent, format!("task-{number}"));
        }
    }

    #[test]
    fn collects_all_annotation_kinds() {
        let doc = "\
- [ ] 1. Wire the parser
  Some free-form description line.
  - _Requirements: 1.1, 2.3 , 1.1_
  - _Depends on: 3, task-2.1_
  - _Context: src/my_parser.rs, docs/grammar.md_
";
        let tasks = parse_tasks(doc);
        assert_eq!(tasks[0].requirements, ["1.1", "2.3", "1.1"]);
        assert_eq!(tasks[0].dependencies, ["task-3", "task-2.1"]);
        assert_eq!(
            tasks[0].context_files,
            ["src/my_parser.rs", "docs/grammar.md"]
        );
    }

    #[test]
    fn blank_line_ends_metadata_window() {
        let doc = "\
- [ ] 1. First

  - _Requirements: 9.9_
- [ ] 2. Second
";
        let tasks = parse_tasks(doc);
        assert!(tasks[0].requirements.is_empty());
        assert!(tasks[1].requirements.is_empty());
    }

    #[test]
    fn unnumbered_checkbox_ends_metadata_window() {
        let doc = "\
- [ ] 1. First
- [ ] loose item
  - _Depends on: task-9_
";
        let tasks = parse_tasks(doc);
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].dependencies.is_empty());
    }

    #[test]
    fn orphan_sub_task_is_dropped() {
        let doc = "- [ ] 1.1 Orphan\n- [ ] 1. Parent\n- [ ] 1.2 Child\n";
        let tasks = parse_tasks(doc);
        assert_eq!(ids(&tasks), ["task-1", "task-1.2"]);
        assert_eq!(tasks[0].sub_tasks, ["task-1.2"]);
    }

    #[test]
    fn sub_task_joins_current_parent_whatever_its_prefix() {
        let tasks = parse_tasks("- [ ] 1. A\n- [ ] 2.1 X\n");
        assert_eq!(ids(&tasks), ["task-1", "task-2.1"]);
        assert_eq!(tasks[1].parent_task_id.as_deref(), Some("task-1"));
        assert_eq!(tasks[0].sub_tasks, ["task-2.1"]);
    }

    #[test]
    fn tasks_file_with_invalid_utf8_still_parses() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tasks.md");
        std::fs::write(&path, b"- [ ] 1. Caf\xe9 setup\n- [x] 2. Next\n").unwrap();

        let tasks = parse_tasks_file(&path);
        assert_eq!(ids(&tasks), ["task-1", "task-2"]);
        assert!(tasks[1].completed);
    }

    #[test]
    fn tasks_file_missing_or_unreadable_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(parse_tasks_file(&dir.path().join("tasks.md")).is_empty());
        // a directory cannot be read as a file
        assert!(parse_tasks_file(dir.path()).is_empty());
    }

    #[test]
    fn malformed_lines_keep_current_parent() {
        let doc = "\
- [ ] 1. Parent
not a task at all
- [?] 1.1 bad mark

- [ ] 1.2 Child
";
        let tasks = parse_tasks(doc);
        assert_eq!(ids(&tasks), ["task-1", "task-1.2"]);
        assert_eq!(tasks[1].parent_task_id.as_deref(), Some("task-1"));
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let doc = "- [ ] 1. First\n- [x] 1. Again\n";
        let tasks = parse_tasks(doc);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "First");
    }

    #[test]
    fn empty_and_garbage_documents() {
        assert!(parse_tasks("").is_empty());
        assert!(parse_tasks("# Tasks\n\nnothing here\n").is_empty());
    }

    #[test]
    fn classify_line_kinds() {
        assert_eq!(classify_line("   "), LineKind::Blank);
        assert_eq!(classify_line("- [ ] todo"), LineKind::Checkbox);
        assert_eq!(classify_line("prose"), LineKind::Other);
        assert_eq!(
            classify_line("  - _Context: a.rs_"),
            LineKind::Annotation(Annotation::Context(vec!["a.rs".to_string()]))
        );
        match classify_line("  - [X] 4.2. Nested title") {
            LineKind::SubTask {
                completed,
                major,
                minor,
                title,
                mark,
            } => {
                assert!(completed);
                assert_eq!((major, minor, title), ("4", "2", "Nested title"));
                assert_eq!(mark, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn set_checkbox_changes_one_byte() {
        let updated = set_checkbox(EXAMPLE, "task-2.1", true).unwrap();
        assert_eq!(updated.len(), EXAMPLE.len());
        let diffs: Vec<_> = EXAMPLE
            .bytes()
            .zip(updated.bytes())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .collect();
        assert_eq!(diffs.len(), 1);
        assert!(parse_tasks(&updated)[2].completed);

        let reverted = set_checkbox(&updated, "task-2.1", false).unwrap();
        assert_eq!(reverted, EXAMPLE);
    }

    #[test]
    fn set_checkbox_preserves_crlf() {
        let doc = "- [ ] 1. First\r\n- [ ] 2. Second\r\n";
        let updated = set_checkbox(doc, "task-2", true).unwrap();
        assert_eq!(updated, "- [ ] 1. First\r\n- [x] 2. Second\r\n");
    }

    #[test]
    fn set_checkbox_unknown_task() {
        assert!(set_checkbox(EXAMPLE, "task-7", true).is_none());
    }

    #[test]
    fn counts_checkboxes_including_unnumbered() {
        assert_eq!(count_checkboxes(EXAMPLE), 4);
        assert_eq!(count_checkboxes("- [ ] loose\n- [x] 1. A\ntext\n"), 2);
    }
}
