use crate::clock::{Clock, Debounce};
use crate::config::Config;
use crate::error::{Result, SpecflowError};
use crate::graph::TaskGraph;
use crate::parser;
use crate::prompt::{phase_prompt, task_prompt, PhasePrompt};
use crate::state::WorkflowState;
use crate::task::{self, Task};
use crate::types::Phase;
use crate::validation::{ValidationContext, ValidationReport, Validator};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// Asks the user whether a phase transition should go ahead.
pub trait Confirm {
    fn confirm(&self, from: Phase, to: Phase, report: &ValidationReport) -> bool;
}

/// Accepts every transition. For non-interactive hosts.
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _from: Phase, _to: Phase, _report: &ValidationReport) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why a workflow operation was refused. State is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    Debounced,
    NoActiveFeature,
    AlreadyFinal { phase: Phase },
    ValidationFailed { phase: Phase, errors: Vec<String> },
    Declined,
    InvalidFeature { name: String },
    TaskNotFound { task_id: String },
    TaskCompleted { task_id: String },
    TaskBlocked { task_id: String, blocked_by: Vec<String> },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Debounced => f.write_str("Called again too quickly; please wait a moment"),
            Rejection::NoActiveFeature => {
                f.write_str("No active workflow; start one with a feature name first")
            }
            Rejection::AlreadyFinal { phase } => {
                write!(f, "Already in the final phase ({phase})")
            }
            Rejection::ValidationFailed { phase, errors } => write!(
                f,
                "Cannot leave the {phase} phase until validation passes: {}",
                errors.join("; ")
            ),
            Rejection::Declined => f.write_str("Phase transition cancelled"),
            Rejection::InvalidFeature { name } => write!(
                f,
                "Invalid feature name '{name}': use lowercase letters, digits and hyphens"
            ),
            Rejection::TaskNotFound { task_id } => write!(f, "Task {task_id} not found"),
            Rejection::TaskCompleted { task_id } => {
                write!(f, "Task {task_id} is already completed")
            }
            Rejection::TaskBlocked {
                task_id,
                blocked_by,
            } => write!(
                f,
                "Task {task_id} is blocked by {}",
                blocked_by.join(", ")
            ),
        }
    }
}

/// Result of a workflow operation: either it happened, or it was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn error(&self) -> Option<String> {
        match self {
            Outcome::Done(_) => None,
            Outcome::Rejected(r) => Some(r.to_string()),
        }
    }

    pub fn into_result(self) -> std::result::Result<T, Rejection> {
        match self {
            Outcome::Done(v) => Ok(v),
            Outcome::Rejected(r) => Err(r),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advance {
    pub from: Phase,
    pub to: Phase,
    pub prompt: PhasePrompt,
    /// Failed warning-level rules. They did not block the transition.
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// The four-phase state machine for the active feature.
///
/// All collaborators are passed in; nothing here reaches for global state.
pub struct Workflow<'a> {
    root: &'a Path,
    config: &'a Config,
    clock: &'a dyn Clock,
    confirm: &'a dyn Confirm,
    validator: Validator,
    state: WorkflowState,
    transition_gate: Debounce,
    task_gate: Debounce,
    start_gate: Debounce,
}

impl<'a> Workflow<'a> {
    /// Build a workflow, resuming from `.specflow/state.yaml` if present.
    pub fn load(
        root: &'a Path,
        config: &'a Config,
        clock: &'a dyn Clock,
        confirm: &'a dyn Confirm,
    ) -> Result<Self> {
        let state = WorkflowState::load_or_new(root, clock.now())?;
        Ok(Self {
            root,
            config,
            clock,
            confirm,
            validator: Validator::default(),
            state,
            transition_gate: Debounce::new(config.debounce.transition_ms),
            task_gate: Debounce::new(config.debounce.task_ms),
            start_gate: Debounce::new(config.debounce.start_ms),
        })
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn current_phase(&self) -> Phase {
        self.state.current_phase
    }

    pub fn current_feature(&self) -> Option<&str> {
        self.state.current_feature.as_deref()
    }

    pub fn spec_dir(&self) -> Option<PathBuf> {
        self.current_feature()
            .map(|f| self.config.spec_dir(self.root, f))
    }

    fn require_feature(&self) -> Result<String> {
        self.state
            .current_feature
            .clone()
            .ok_or(SpecflowError::NoActiveFeature)
    }

    /// Apply `change` to a copy of the state, persist it, then commit.
    fn commit(&mut self, change: impl FnOnce(&mut WorkflowState)) -> Result<()> {
        let mut next = self.state.clone();
        change(&mut next);
        next.save(self.root)?;
        self.state = next;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase operations
    // -----------------------------------------------------------------------

    /// Start (or restart) the workflow for `feature` at the requirements phase.
    pub fn start_workflow(&mut self, feature: &str) -> Result<Outcome<PhasePrompt>> {
        if !self.start_gate.try_enter(self.clock.now()) {
            return Ok(Outcome::Rejected(Rejection::Debounced));
        }
        if crate::paths::validate_slug(feature).is_err() {
            return Ok(Outcome::Rejected(Rejection::InvalidFeature {
                name: feature.to_string(),
            }));
        }

        let spec_dir = self.config.spec_dir(self.root, feature);
        crate::io::ensure_dir(&spec_dir)?;
        let now = self.clock.now();
        self.commit(|s| s.begin(feature, now))?;
        tracing::info!(feature, "started workflow");

        Ok(Outcome::Done(phase_prompt(
            Phase::Requirements,
            feature,
            &spec_dir,
        )))
    }

    pub fn validate(&self, phase: Phase) -> Result<ValidationReport> {
        let feature = self.require_feature()?;
        let ctx = ValidationContext::load(self.root, self.config, &feature, phase);
        Ok(self.validator.validate_phase(phase, &ctx))
    }

    pub fn validate_current(&self) -> Result<ValidationReport> {
        self.validate(self.current_phase())
    }

    /// Advance to the next phase if validation and the user allow it.
    ///
    /// Refusals come back as `Outcome::Rejected`; `Err` is reserved for
    /// filesystem faults.
    pub fn move_to_next_phase(&mut self) -> Result<Outcome<Advance>> {
        if !self.transition_gate.try_enter(self.clock.now()) {
            return Ok(Outcome::Rejected(Rejection::Debounced));
        }
        let Some(feature) = self.state.current_feature.clone() else {
            return Ok(Outcome::Rejected(Rejection::NoActiveFeature));
        };
        let from = self.current_phase();
        let Some(to) = from.next() else {
            return Ok(Outcome::Rejected(Rejection::AlreadyFinal { phase: from }));
        };

        let report = self.validate(from)?;
        if !report.can_advance() {
            tracing::debug!(
                phase = %from,
                errors = report.error_count,
                "transition blocked by validation"
            );
            return Ok(Outcome::Rejected(Rejection::ValidationFailed {
                phase: from,
                errors: report.error_messages(),
            }));
        }

        if !self.confirm.confirm(from, to, &report) {
            return Ok(Outcome::Rejected(Rejection::Declined));
        }

        let now = self.clock.now();
        self.commit(|s| s.enter(to, now))?;
        tracing::info!(feature = %feature, from = %from, to = %to, "advanced phase");

        let spec_dir = self.config.spec_dir(self.root, &feature);
        Ok(Outcome::Done(Advance {
            from,
            to,
            prompt: phase_prompt(to, &feature, &spec_dir),
            warnings: report.warning_messages(),
        }))
    }

    // -----------------------------------------------------------------------
    // Task operations
    // -----------------------------------------------------------------------

    pub fn tasks_path(&self) -> Result<PathBuf> {
        let feature = self.require_feature()?;
        Ok(self
            .config
            .spec_dir(self.root, &feature)
            .join(Phase::Tasks.artifact().filename()))
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        Ok(parser::parse_tasks_file(&self.tasks_path()?))
    }

    /// Mark a task done or not done, rewriting its checkbox in tasks.md.
    pub fn update_task_status(&self, task_id: &str, completed: bool) -> Result<Vec<Task>> {
        task::update_status(&self.tasks_path()?, task_id, completed)
    }

    /// Build the execution prompt for one task if it can run now.
    pub fn execute_task(&mut self, task_id: &str) -> Result<Outcome<PhasePrompt>> {
        if !self.task_gate.try_enter(self.clock.now()) {
            return Ok(Outcome::Rejected(Rejection::Debounced));
        }
        let Some(feature) = self.state.current_feature.clone() else {
            return Ok(Outcome::Rejected(Rejection::NoActiveFeature));
        };

        let tasks = self.tasks()?;
        let graph = TaskGraph::new(&tasks);
        let Some(task) = graph.get(task_id) else {
            return Ok(Outcome::Rejected(Rejection::TaskNotFound {
                task_id: task_id.to_string(),
            }));
        };
        if task.completed {
            return Ok(Outcome::Rejected(Rejection::TaskCompleted {
                task_id: task_id.to_string(),
            }));
        }
        if !graph.can_execute(task) {
            return Ok(Outcome::Rejected(Rejection::TaskBlocked {
                task_id: task_id.to_string(),
                blocked_by: graph.blocked_by(task),
            }));
        }

        let spec_dir = self.config.spec_dir(self.root, &feature);
        Ok(Outcome::Done(task_prompt(task, &feature, &spec_dir)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
