use crate::task::Task;
use crate::types::{ArtifactFile, Phase};
use serde::Serialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Prompt descriptors
// ---------------------------------------------------------------------------

/// A prompt handed to the AI assistant after a workflow step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhasePrompt {
    pub phase: Phase,
    pub feature: String,
    pub title: String,
    pub body: String,
}

/// Prompt for starting work in `phase`.
pub fn phase_prompt(phase: Phase, feature: &str, spec_dir: &Path) -> PhasePrompt {
    let dir = spec_dir.display();
    let (title, body) = match phase {
        Phase::Requirements => (
            format!("Write requirements for '{feature}'"),
            format!(
                "Create {dir}/requirements.md for the feature '{feature}'.\n\
                 Write one section per requirement with a user story \
                 (\"As a [role], I want [feature], so that [benefit]\") and numbered \
                 acceptance criteria in EARS form \
                 (\"WHEN [event] THEN [system] SHALL [response]\")."
            ),
        ),
        Phase::Design => (
            format!("Write the design for '{feature}'"),
            format!(
                "Read {dir}/requirements.md and create {dir}/design.md.\n\
                 Include Overview, Architecture, Components and Interfaces, Data Models, \
                 Error Handling and Testing Strategy sections. Reference the requirements \
                 each design decision addresses."
            ),
        ),
        Phase::Tasks => (
            format!("Plan implementation tasks for '{feature}'"),
            format!(
                "Read {dir}/requirements.md and {dir}/design.md and create {dir}/tasks.md.\n\
                 Write a numbered checklist (\"- [ ] 1. Title\", sub-tasks \"- [ ] 1.1 Title\"). \
                 Under each task add \"_Requirements: 1.1, 2.3_\" and, where a task needs \
                 another finished first, \"_Depends on: task-1_\"."
            ),
        ),
        Phase::Execution => (
            format!("Implement '{feature}'"),
            format!(
                "Work through {dir}/tasks.md one task at a time. Before each task read \
                 requirements.md and design.md in {dir}. Mark a task complete only when \
                 its code and tests are done."
            ),
        ),
    };
    PhasePrompt {
        phase,
        feature: feature.to_string(),
        title,
        body,
    }
}

/// Prompt for implementing one task.
pub fn task_prompt(task: &Task, feature: &str, spec_dir: &Path) -> PhasePrompt {
    let dir = spec_dir.display();
    let mut body = format!(
        "Implement {} \"{}\" for the feature '{feature}'.\n\
         Read {dir}/requirements.md, {dir}/design.md and {dir}/tasks.md first.",
        task.id, task.title
    );
    if !task.requirements.is_empty() {
        body.push_str(&format!("\nRequirements: {}", task.requirements.join(", ")));
    }
    if !task.context_files.is_empty() {
        body.push_str(&format!("\nRelevant files: {}", task.context_files.join(", ")));
    }
    if !task.sub_tasks.is_empty() {
        body.push_str(&format!("\nSub-tasks: {}", task.sub_tasks.join(", ")));
    }
    body.push_str("\nImplement only this task, then stop for review.");

    PhasePrompt {
        phase: Phase::Execution,
        feature: feature.to_string(),
        title: format!("{}: {}", task.id, task.title),
        body,
    }
}

// ---------------------------------------------------------------------------
// Artifact templates
// ---------------------------------------------------------------------------

/// Skeleton content for a missing phase artifact.
pub fn artifact_template(artifact: ArtifactFile, feature: &str) -> String {
    match artifact {
        ArtifactFile::Requirements => format!(
            "# Requirements Document: {feature}\n\n\
             ## Introduction\n\n\
             ## Requirements\n\n\
             ### Requirement 1\n\n\
             **User Story:** As a [role], I want [feature], so that [benefit]\n\n\
             #### Acceptance Criteria\n\n\
             1. WHEN [event] THEN [system] SHALL [response]\n"
        ),
        ArtifactFile::Design => format!(
            "# Design Document: {feature}\n\n\
             ## Overview\n\n\
             ## Architecture\n\n\
             ## Components and Interfaces\n\n\
             ## Data Models\n\n\
             ## Error Handling\n\n\
             ## Testing Strategy\n\n\
             Each section should reference the requirement it addresses.\n"
        ),
        ArtifactFile::Tasks => format!(
            "# Implementation Plan: {feature}\n\n\
             - [ ] 1. Set up project structure\n  \
             - _Requirements: 1.1_\n\n\
             - [ ] 2. Implement core functionality\n  \
             - _Requirements: 1.1_\n  \
             - _Depends on: task-1_\n\n\
             - [ ] 3. Add tests\n  \
             - _Requirements: 1.1_\n  \
             - _Depends on: task-2_\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_tasks;

    #[test]
    fn each_phase_has_a_prompt() {
        for phase in Phase::all() {
            let p = phase_prompt(*phase, "auth", Path::new("specs/auth"));
            assert_eq!(p.phase, *phase);
            assert!(p.title.contains("auth"));
            assert!(p.body.contains("specs/auth"));
        }
    }

    #[test]
    fn task_prompt_lists_metadata() {
        let tasks = parse_tasks(
            "- [ ] 1. Parser\n  - _Requirements: 2.1_\n  - _Context: src/parser.rs_\n",
        );
        let p = task_prompt(&tasks[0], "auth", Path::new("specs/auth"));
        assert_eq!(p.title, "task-1: Parser");
        assert!(p.body.contains("Requirements: 2.1"));
        assert!(p.body.contains("src/parser.rs"));
    }

    #[test]
    fn tasks_template_parses() {
        let tasks = parse_tasks(&artifact_template(ArtifactFile::Tasks, "auth"));
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[1].dependencies, ["task-1"]);
        assert_eq!(tasks[2].requirements, ["1.1"]);
    }
}
