use crate::error::Result;
use crate::graph::TaskGraph;
use crate::parser::{count_checkboxes, parse_tasks};
use crate::types::{ArtifactFile, Phase, Severity};
use crate::validation::{Remediation, RuleOutcome, ValidationContext, ValidationRule};
use regex::Regex;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Helper macro for concise rule definitions
// ---------------------------------------------------------------------------

macro_rules! rule {
    (
        id: $id:expr,
        name: $name:expr,
        description: $desc:expr,
        severity: $sev:expr,
        $(phase: $phase:expr,)?
        check: $check:expr
    ) => {
        ValidationRule {
            id: $id,
            name: $name,
            description: $desc,
            severity: $sev,
            phase: {
                #[allow(unused_assignments, unused_mut)]
                let mut v: Option<Phase> = None;
                $(v = Some($phase);)?
                v
            },
            check: $check,
        }
    };
}

// ---------------------------------------------------------------------------
// Check helpers
// ---------------------------------------------------------------------------

fn architecture_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+.*\bArchitecture\b").unwrap())
}

fn file_exists(ctx: &ValidationContext, file: ArtifactFile) -> Result<RuleOutcome> {
    if ctx.has_file(file) {
        return Ok(RuleOutcome::pass(format!("{} exists", file.filename())));
    }
    if let Some(err) = ctx.read_error(file) {
        return Ok(unreadable(file, err));
    }
    Ok(RuleOutcome::fail(format!(
        "{} not found in {}",
        file.filename(),
        ctx.spec_dir.display()
    ))
    .suggest(format!("Create {} for '{}'", file.filename(), ctx.feature))
    .with_fix(Remediation::create_from_template(file)))
}

/// Content of `file`, or a failed outcome explaining that it is missing.
fn require(ctx: &ValidationContext, file: ArtifactFile) -> std::result::Result<&str, RuleOutcome> {
    ctx.file(file).ok_or_else(|| match ctx.read_error(file) {
        Some(err) => unreadable(file, err),
        None => RuleOutcome::fail(format!("{} is missing", file.filename()))
            .suggest(format!("Create {} first", file.filename())),
    })
}

fn unreadable(file: ArtifactFile, err: &str) -> RuleOutcome {
    RuleOutcome::fail(format!("{} could not be read: {err}", file.filename()))
        .suggest(format!("Check the permissions of {}", file.filename()))
}

macro_rules! content_or_fail {
    ($ctx:expr, $file:expr) => {
        match require($ctx, $file) {
            Ok(content) => content,
            Err(outcome) => return Ok(outcome),
        }
    };
}

// ---------------------------------------------------------------------------
// General rules
// ---------------------------------------------------------------------------

fn workspace_valid(ctx: &ValidationContext) -> Result<RuleOutcome> {
    if ctx.workspace_root.is_dir() {
        Ok(RuleOutcome::pass("Workspace folder is open"))
    } else {
        Ok(RuleOutcome::fail(format!(
            "Workspace folder {} does not exist",
            ctx.workspace_root.display()
        ))
        .suggest("Open a workspace folder before running the workflow"))
    }
}

fn spec_dir_exists(ctx: &ValidationContext) -> Result<RuleOutcome> {
    if ctx.spec_dir.is_dir() {
        Ok(RuleOutcome::pass("Spec directory exists"))
    } else {
        Ok(RuleOutcome::fail(format!(
            "Spec directory {} does not exist",
            ctx.spec_dir.display()
        ))
        .suggest("Start the workflow for this feature to create its directory")
        .with_fix(Remediation::create_directory(&ctx.spec_dir)))
    }
}

// ---------------------------------------------------------------------------
// Requirements rules
// ---------------------------------------------------------------------------

fn requirements_user_stories(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Requirements);
    if content.contains("User Story:") || content.contains("As a") {
        Ok(RuleOutcome::pass("User stories found"))
    } else {
        Ok(RuleOutcome::fail("No user stories found").suggest(
            "Add user stories: \"**User Story:** As a [role], \
             I want [feature], so that [benefit]\"",
        ))
    }
}

fn requirements_ears(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Requirements);
    if content.contains("WHEN") && content.contains("SHALL") {
        Ok(RuleOutcome::pass("EARS acceptance criteria found"))
    } else {
        Ok(RuleOutcome::fail("No EARS-format acceptance criteria found").suggest(
            "Write acceptance criteria as \"WHEN [event] THEN [system] SHALL [response]\"",
        ))
    }
}

fn requirements_word_count(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Requirements);
    let words = content.split_whitespace().count();
    let min = ctx.thresholds.min_requirement_words;
    if words >= min {
        Ok(RuleOutcome::pass(format!("Requirements have {words} words")))
    } else {
        Ok(RuleOutcome::fail(format!(
            "Requirements are short ({words} words, at least {min} expected)"
        ))
        .suggest("Cover edge cases, error handling and non-functional requirements"))
    }
}

// ---------------------------------------------------------------------------
// Design rules
// ---------------------------------------------------------------------------

fn design_architecture(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Design);
    if architecture_heading_re().is_match(content) {
        Ok(RuleOutcome::pass("Architecture section found"))
    } else {
        Ok(RuleOutcome::fail("Design has no Architecture section")
            .suggest("Add an \"## Architecture\" section describing the main components")
            .with_fix(Remediation::append_section(
                ArtifactFile::Design,
                "Architecture",
                "Describe the overall structure and how the components interact.",
            )))
    }
}

fn design_references_requirements(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Design);
    if !content.to_lowercase().contains("requirement") {
        return Ok(RuleOutcome::fail("Design does not reference the requirements")
            .suggest("Link each design decision to the requirement it addresses"));
    }
    if !ctx.has_file(ArtifactFile::Requirements) {
        return Ok(
            RuleOutcome::fail("Design references requirements but requirements.md is missing")
                .suggest("Restore requirements.md or go back to the requirements phase")
                .with_fix(Remediation::create_from_template(ArtifactFile::Requirements)),
        );
    }
    Ok(RuleOutcome::pass("Design references the requirements"))
}

// ---------------------------------------------------------------------------
// Tasks rules
// ---------------------------------------------------------------------------

fn tasks_checkboxes(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Tasks);
    let n = count_checkboxes(content);
    if n > 0 {
        Ok(RuleOutcome::pass(format!("{n} task(s) found")))
    } else {
        Ok(RuleOutcome::fail("No checkbox tasks found")
            .suggest("Write tasks as \"- [ ] 1. Task title\""))
    }
}

fn tasks_requirement_refs(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Tasks);
    if content.contains("_Requirements:") {
        Ok(RuleOutcome::pass("Tasks reference requirements"))
    } else {
        Ok(RuleOutcome::fail("Tasks do not reference any requirements")
            .suggest("Add \"_Requirements: 1.1, 2.3_\" under each task"))
    }
}

fn tasks_count(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Tasks);
    let n = count_checkboxes(content);
    let (min, max) = (ctx.thresholds.min_tasks, ctx.thresholds.max_tasks);
    if n < min {
        Ok(RuleOutcome::fail(format!("Only {n} task(s); at least {min} expected"))
            .suggest("Break the work down into smaller, testable steps"))
    } else if n > max {
        Ok(RuleOutcome::fail(format!("{n} tasks is more than the recommended {max}"))
            .suggest("Group related tasks under main tasks or split the feature"))
    } else {
        Ok(RuleOutcome::pass(format!("{n} tasks")))
    }
}

fn tasks_dependency_integrity(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let content = content_or_fail!(ctx, ArtifactFile::Tasks);
    let tasks = parse_tasks(content);
    let graph = TaskGraph::new(&tasks);
    let unknown = graph.unknown_dependencies();
    let cycles = graph.dependency_cycles();
    if unknown.is_empty() && cycles.is_empty() {
        return Ok(RuleOutcome::pass("All dependencies resolve"));
    }

    let mut problems: Vec<String> = unknown
        .iter()
        .map(|(task, dep)| format!("{task} depends on unknown {dep}"))
        .collect();
    problems.extend(cycles.iter().map(|c| format!("cycle: {}", c.join(" -> "))));
    Ok(
        RuleOutcome::fail(format!("Dependency problems: {}", problems.join("; "))).suggest(
            "Tasks with unresolved dependencies stay blocked; fix the \"_Depends on:_\" lines",
        ),
    )
}

// ---------------------------------------------------------------------------
// Execution rules
// ---------------------------------------------------------------------------

fn execution_progress(ctx: &ValidationContext) -> Result<RuleOutcome> {
    let tasks = ctx.file(ArtifactFile::Tasks).map(parse_tasks).unwrap_or_default();
    let total = tasks.len();
    let done = tasks.iter().filter(|t| t.completed).count();
    let pct = if total == 0 { 0 } else { done * 100 / total };
    Ok(RuleOutcome::pass(format!("{done}/{total} tasks completed ({pct}%)")))
}

// ---------------------------------------------------------------------------
// Default rules
// ---------------------------------------------------------------------------

pub fn default_rules() -> Vec<ValidationRule> {
    vec![
        rule! {
            id: "workspace-valid",
            name: "Workspace",
            description: "A workspace folder is open",
            severity: Severity::Error,
            check: workspace_valid
        },
        rule! {
            id: "spec-directory-exists",
            name: "Spec directory",
            description: "The feature's spec directory exists",
            severity: Severity::Error,
            check: spec_dir_exists
        },
        // Requirements
        rule! {
            id: "requirements-file-exists",
            name: "Requirements file",
            description: "requirements.md exists",
            severity: Severity::Error,
            phase: Phase::Requirements,
            check: |ctx| file_exists(ctx, ArtifactFile::Requirements)
        },
        rule! {
            id: "requirements-user-stories",
            name: "User stories",
            description: "Requirements contain user stories",
            severity: Severity::Error,
            phase: Phase::Requirements,
            check: requirements_user_stories
        },
        rule! {
            id: "requirements-ears-format",
            name: "EARS criteria",
            description: "Acceptance criteria use WHEN ... SHALL",
            severity: Severity::Error,
            phase: Phase::Requirements,
            check: requirements_ears
        },
        rule! {
            id: "requirements-word-count",
            name: "Requirements length",
            description: "Requirements are detailed enough",
            severity: Severity::Warning,
            phase: Phase::Requirements,
            check: requirements_word_count
        },
        // Design
        rule! {
            id: "design-file-exists",
            name: "Design file",
            description: "design.md exists",
            severity: Severity::Error,
            phase: Phase::Design,
            check: |ctx| file_exists(ctx, ArtifactFile::Design)
        },
        rule! {
            id: "design-architecture-section",
            name: "Architecture section",
            description: "Design has an Architecture section",
            severity: Severity::Error,
            phase: Phase::Design,
            check: design_architecture
        },
        rule! {
            id: "design-references-requirements",
            name: "Requirements traceability",
            description: "Design refers back to the requirements",
            severity: Severity::Warning,
            phase: Phase::Design,
            check: design_references_requirements
        },
        // Tasks
        rule! {
            id: "tasks-file-exists",
            name: "Tasks file",
            description: "tasks.md exists",
            severity: Severity::Error,
            phase: Phase::Tasks,
            check: |ctx| file_exists(ctx, ArtifactFile::Tasks)
        },
        rule! {
            id: "tasks-has-checkboxes",
            name: "Task checklist",
            description: "Tasks are written as a checklist",
            severity: Severity::Error,
            phase: Phase::Tasks,
            check: tasks_checkboxes
        },
        rule! {
            id: "tasks-requirement-refs",
            name: "Requirement references",
            description: "Tasks carry _Requirements:_ annotations",
            severity: Severity::Warning,
            phase: Phase::Tasks,
            check: tasks_requirement_refs
        },
        rule! {
            id: "tasks-count",
            name: "Task count",
            description: "The number of tasks is manageable",
            severity: Severity::Warning,
            phase: Phase::Tasks,
            check: tasks_count
        },
        rule! {
            id: "tasks-dependency-integrity",
            name: "Dependencies",
            description: "Every _Depends on:_ reference resolves and no cycles exist",
            severity: Severity::Info,
            phase: Phase::Tasks,
            check: tasks_dependency_integrity
        },
        // Execution
        rule! {
            id: "execution-has-tasks",
            name: "Task checklist",
            description: "tasks.md has tasks to execute",
            severity: Severity::Error,
            phase: Phase::Execution,
            check: tasks_checkboxes
        },
        rule! {
            id: "execution-progress",
            name: "Progress",
            description: "Completed task ratio",
            severity: Severity::Info,
            phase: Phase::Execution,
            check: execution_progress
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::types::OverallStatus;
    use crate::validation::{FixAction, ValidationReport, Validator};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const REQUIREMENTS: &str = "\
# Requirements

### Requirement 1

**User Story:** As a user, I want to log in, so that my work is saved.

1. WHEN the user submits valid credentials THEN the system SHALL start a session
";

    const DESIGN: &str = "\
# Design

## Overview

Covers requirement 1.

## Architecture

A session service in front of the user store.
";

    const TASKS: &str = "\
- [x] 1. Scaffold
  - _Requirements: 1.1_
- [ ] 2. Session service
  - _Requirements: 1.1_
  - _Depends on: task-1_
- [ ] 3. Tests
  - _Depends on: task-2_
";

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::create_dir_all(dir.path().join("specs/auth")).unwrap();
            Self { dir }
        }

        fn ctx(&self, phase: Phase, files: &[(&str, &str)]) -> ValidationContext {
            ValidationContext {
                spec_dir: self.dir.path().join("specs/auth"),
                feature: "auth".to_string(),
                phase,
                files: files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
                unreadable: BTreeMap::new(),
                workspace_root: self.dir.path().to_path_buf(),
                thresholds: ValidationConfig::default(),
            }
        }

        fn validate(&self, phase: Phase, files: &[(&str, &str)]) -> ValidationReport {
            Validator::default().validate_phase(phase, &self.ctx(phase, files))
        }
    }

    fn passed(report: &ValidationReport, id: &str) -> bool {
        report.result(id).unwrap_or_else(|| panic!("no result for {id}")).passed
    }

    #[test]
    fn requirements_phase_passes_with_warning_for_short_doc() {
        let f = Fixture::new();
        let report = f.validate(Phase::Requirements, &[("requirements.md", REQUIREMENTS)]);
        assert!(passed(&report, "requirements-file-exists"));
        assert!(passed(&report, "requirements-user-stories"));
        assert!(passed(&report, "requirements-ears-format"));
        assert!(!passed(&report, "requirements-word-count"));
        assert_eq!(report.overall_status, OverallStatus::Warning);
        assert!(report.can_advance());
    }

    #[test]
    fn long_requirements_pass_outright() {
        let f = Fixture::new();
        let long = format!("{REQUIREMENTS}\n{}", "detail ".repeat(250));
        let report = f.validate(Phase::Requirements, &[("requirements.md", &long)]);
        assert_eq!(report.overall_status, OverallStatus::Passed);
    }

    #[test]
    fn missing_requirements_file_fails_with_fix() {
        let f = Fixture::new();
        let report = f.validate(Phase::Requirements, &[]);
        assert_eq!(report.overall_status, OverallStatus::Failed);
        let r = report.result("requirements-file-exists").unwrap();
        assert_eq!(
            r.fix.as_ref().map(|fix| &fix.action),
            Some(&FixAction::CreateFromTemplate {
                file: ArtifactFile::Requirements
            })
        );
        assert!(!passed(&report, "requirements-ears-format"));
    }

    #[test]
    fn ears_needs_both_tokens() {
        let f = Fixture::new();
        let doc = "User Story: As a user\nWHEN something happens the system responds\n";
        let report = f.validate(Phase::Requirements, &[("requirements.md", doc)]);
        assert!(!passed(&report, "requirements-ears-format"));
        assert_eq!(report.overall_status, OverallStatus::Failed);
    }

    #[test]
    fn adding_architecture_section_flips_only_that_rule() {
        let f = Fixture::new();
        let without = "# Design\n\nThis design covers requirement 1.\n";
        let with = format!("{without}\n## Architecture\n\nLayers.\n");
        let files_before = [("requirements.md", REQUIREMENTS), ("design.md", without)];
        let files_after = [("requirements.md", REQUIREMENTS), ("design.md", with.as_str())];

        let before = f.validate(Phase::Design, &files_before);
        let after = f.validate(Phase::Design, &files_after);

        assert!(!passed(&before, "design-architecture-section"));
        assert!(passed(&after, "design-architecture-section"));
        for (b, a) in before.results.iter().zip(&after.results) {
            assert_eq!(b.rule_id, a.rule_id);
            if b.rule_id != "design-architecture-section" {
                assert_eq!(b.passed, a.passed, "rule {} changed", b.rule_id);
            }
        }
        assert_eq!(before.overall_status, OverallStatus::Failed);
        assert_eq!(after.overall_status, OverallStatus::Passed);
    }

    #[test]
    fn architecture_in_prose_is_not_a_section() {
        let f = Fixture::new();
        let doc = "# Design\n\nThe architecture is simple. See requirement 1.\n";
        let report = f.validate(
            Phase::Design,
            &[("requirements.md", REQUIREMENTS), ("design.md", doc)],
        );
        assert!(!passed(&report, "design-architecture-section"));
    }

    #[test]
    fn unreadable_artifact_fails_only_its_rules() {
        let f = Fixture::new();
        let mut ctx = f.ctx(Phase::Design, &[("requirements.md", REQUIREMENTS)]);
        ctx.unreadable
            .insert("design.md".to_string(), "permission denied".to_string());
        let report = Validator::default().validate_phase(Phase::Design, &ctx);

        let exists = report.result("design-file-exists").unwrap();
        assert!(!exists.passed);
        assert!(exists.message.contains("could not be read"));
        assert!(exists.fix.is_none());
        assert!(passed(&report, "spec-directory-exists"));
    }

    #[test]
    fn design_traceability_needs_requirements_file() {
        let f = Fixture::new();
        let report = f.validate(Phase::Design, &[("design.md", DESIGN)]);
        let r = report.result("design-references-requirements").unwrap();
        assert!(!r.passed);
        assert!(r.message.contains("requirements.md is missing"));
        assert_eq!(report.overall_status, OverallStatus::Warning);

        let report = f.validate(
            Phase::Design,
            &[("requirements.md", REQUIREMENTS), ("design.md", DESIGN)],
        );
        assert!(passed(&report, "design-references-requirements"));
    }

    #[test]
    fn tasks_phase_rules() {
        let f = Fixture::new();
        let report = f.validate(Phase::Tasks, &[("tasks.md", TASKS)]);
        assert!(passed(&report, "tasks-has-checkboxes"));
        assert!(passed(&report, "tasks-requirement-refs"));
        assert!(passed(&report, "tasks-count"));
        assert!(passed(&report, "tasks-dependency-integrity"));
        assert_eq!(report.overall_status, OverallStatus::Passed);
    }

    #[test]
    fn task_count_messages_differ() {
        let f = Fixture::new();
        let few = "- [ ] 1. Only one\n  - _Requirements: 1_\n";
        let report = f.validate(Phase::Tasks, &[("tasks.md", few)]);
        let few_msg = report.result("tasks-count").unwrap().message.clone();
        assert!(few_msg.starts_with("Only 1 task"));

        let many: String = (1..=21).map(|i| format!("- [ ] {i}. Step {i}\n")).collect();
        let report = f.validate(Phase::Tasks, &[("tasks.md", &many)]);
        let r = report.result("tasks-count").unwrap();
        assert!(!r.passed);
        assert!(r.message.contains("more than the recommended 20"));
        assert_ne!(few_msg, r.message);
    }

    #[test]
    fn tasks_without_checkboxes_fail() {
        let f = Fixture::new();
        let report = f.validate(Phase::Tasks, &[("tasks.md", "# Tasks\n\n1. no checkboxes\n")]);
        assert!(!passed(&report, "tasks-has-checkboxes"));
        assert_eq!(report.overall_status, OverallStatus::Failed);
    }

    #[test]
    fn dependency_problems_are_informational() {
        let f = Fixture::new();
        let doc = "\
- [ ] 1. A
  - _Requirements: 1_
  - _Depends on: task-2_
- [ ] 2. B
  - _Depends on: task-1_
- [ ] 3. C
  - _Depends on: task-8_
";
        let report = f.validate(Phase::Tasks, &[("tasks.md", doc)]);
        let r = report.result("tasks-dependency-integrity").unwrap();
        assert!(!r.passed);
        assert!(r.message.contains("task-3 depends on unknown task-8"));
        assert!(r.message.contains("cycle: task-1 -> task-2"));
        assert_eq!(report.overall_status, OverallStatus::Passed);
    }

    #[test]
    fn execution_reports_progress() {
        let f = Fixture::new();
        let report = f.validate(Phase::Execution, &[("tasks.md", TASKS)]);
        let r = report.result("execution-progress").unwrap();
        assert!(r.passed);
        assert_eq!(r.message, "1/3 tasks completed (33%)");
        assert!(report.can_advance());

        let report = f.validate(Phase::Execution, &[]);
        assert!(!passed(&report, "execution-has-tasks"));
        assert!(passed(&report, "execution-progress"));
    }

    #[test]
    fn general_rules_check_directories() {
        let f = Fixture::new();
        let mut ctx = f.ctx(Phase::Tasks, &[("tasks.md", TASKS)]);
        ctx.spec_dir = f.dir.path().join("specs/missing");
        let report = Validator::default().validate_phase(Phase::Tasks, &ctx);
        let r = report.result("spec-directory-exists").unwrap();
        assert!(!r.passed);
        assert!(matches!(
            r.fix.as_ref().map(|fix| &fix.action),
            Some(FixAction::CreateDirectory { .. })
        ));
        assert!(passed(&report, "workspace-valid"));
        assert_eq!(report.overall_status, OverallStatus::Failed);
    }

    #[test]
    fn every_phase_has_rules() {
        let rules = default_rules();
        for phase in Phase::all() {
            assert!(rules.iter().any(|r| r.phase == Some(*phase)));
        }
        let general = rules.iter().filter(|r| r.phase.is_none()).count();
        assert_eq!(general, 2);
    }
}
