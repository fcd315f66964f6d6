use crate::config::{Config, ValidationConfig};
use crate::error::Result;
use crate::prompt::artifact_template;
use crate::types::{ArtifactFile, OverallStatus, Phase, Severity};
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ValidationContext
// ---------------------------------------------------------------------------

/// Read-only snapshot handed to every rule.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub spec_dir: PathBuf,
    pub feature: String,
    pub phase: Phase,
    /// Artifact filename → content, for the artifacts that exist.
    pub files: BTreeMap<String, String>,
    /// Artifact filename → read error, for artifacts present but unreadable.
    pub unreadable: BTreeMap<String, String>,
    pub workspace_root: PathBuf,
    pub thresholds: ValidationConfig,
}

impl ValidationContext {
    /// Snapshot every phase artifact present in the feature's spec directory.
    ///
    /// Invalid UTF-8 is decoded lossily. A file that exists but cannot be read
    /// is recorded in `unreadable` so only the rules that need it fail.
    pub fn load(root: &Path, config: &Config, feature: &str, phase: Phase) -> Self {
        let spec_dir = config.spec_dir(root, feature);
        let mut files = BTreeMap::new();
        let mut unreadable = BTreeMap::new();
        for artifact in ArtifactFile::all() {
            let name = artifact.filename().to_string();
            match crate::io::read_optional_lossy(&spec_dir.join(artifact.filename())) {
                Ok(Some(content)) => {
                    files.insert(name, content);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(file = %name, error = %e, "artifact unreadable");
                    unreadable.insert(name, e.to_string());
                }
            }
        }
        Self {
            spec_dir,
            feature: feature.to_string(),
            phase,
            files,
            unreadable,
            workspace_root: root.to_path_buf(),
            thresholds: config.validation.clone(),
        }
    }

    pub fn file(&self, artifact: ArtifactFile) -> Option<&str> {
        self.files.get(artifact.filename()).map(String::as_str)
    }

    pub fn has_file(&self, artifact: ArtifactFile) -> bool {
        self.files.contains_key(artifact.filename())
    }

    pub fn read_error(&self, artifact: ArtifactFile) -> Option<&str> {
        self.unreadable.get(artifact.filename()).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Remediation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FixAction {
    CreateFromTemplate {
        file: ArtifactFile,
    },
    AppendSection {
        file: ArtifactFile,
        heading: String,
        body: String,
    },
    CreateDirectory {
        path: PathBuf,
    },
}

/// A one-step fix a host can offer next to a failed rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Remediation {
    pub description: String,
    pub action: FixAction,
}

impl Remediation {
    pub fn create_from_template(file: ArtifactFile) -> Self {
        Self {
            description: format!("Create {} from template", file.filename()),
            action: FixAction::CreateFromTemplate { file },
        }
    }

    pub fn append_section(file: ArtifactFile, heading: &str, body: &str) -> Self {
        Self {
            description: format!("Add a '{heading}' section to {}", file.filename()),
            action: FixAction::AppendSection {
                file,
                heading: heading.to_string(),
                body: body.to_string(),
            },
        }
    }

    pub fn create_directory(path: &Path) -> Self {
        Self {
            description: format!("Create directory {}", path.display()),
            action: FixAction::CreateDirectory {
                path: path.to_path_buf(),
            },
        }
    }

    /// Perform the fix against the feature's spec directory.
    pub fn apply(&self, spec_dir: &Path, feature: &str) -> Result<()> {
        match &self.action {
            FixAction::CreateFromTemplate { file } => {
                let path = spec_dir.join(file.filename());
                crate::io::write_if_missing(&path, artifact_template(*file, feature).as_bytes())?;
            }
            FixAction::AppendSection {
                file,
                heading,
                body,
            } => {
                let path = spec_dir.join(file.filename());
                crate::io::append_text(&path, &format!("\n## {heading}\n\n{body}\n"))?;
            }
            FixAction::CreateDirectory { path } => crate::io::ensure_dir(path)?,
        }
        tracing::info!(fix = %self.description, "applied remediation");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rules and results
// ---------------------------------------------------------------------------

/// What a rule's check reports.
#[derive(Debug, Clone, Default)]
pub struct RuleOutcome {
    pub passed: bool,
    pub message: String,
    pub suggestions: Vec<String>,
    pub fix: Option<Remediation>,
}

impl RuleOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_fix(mut self, fix: Remediation) -> Self {
        self.fix = Some(fix);
        self
    }
}

/// A named check. `phase: None` marks a general rule that runs in every phase.
pub struct ValidationRule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub phase: Option<Phase>,
    pub check: fn(&ValidationContext) -> Result<RuleOutcome>,
}

impl ValidationRule {
    pub fn applies_to(&self, phase: Phase) -> bool {
        self.phase.map(|p| p == phase).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Remediation>,
}

// ---------------------------------------------------------------------------
// ValidationReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub phase: Phase,
    pub feature: String,
    pub overall_status: OverallStatus,
    pub results: Vec<RuleResult>,
    pub passed_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl ValidationReport {
    pub fn from_results(phase: Phase, feature: &str, results: Vec<RuleResult>) -> Self {
        let failed = |s: Severity| {
            results
                .iter()
                .filter(|r| !r.passed && r.severity == s)
                .count()
        };
        let error_count = failed(Severity::Error);
        let warning_count = failed(Severity::Warning);
        let info_count = failed(Severity::Info);
        let passed_count = results.iter().filter(|r| r.passed).count();

        let overall_status = if error_count > 0 {
            OverallStatus::Failed
        } else if warning_count > 0 {
            OverallStatus::Warning
        } else {
            OverallStatus::Passed
        };

        Self {
            phase,
            feature: feature.to_string(),
            overall_status,
            results,
            passed_count,
            error_count,
            warning_count,
            info_count,
        }
    }

    /// Warnings do not block a transition; failed error rules do.
    pub fn can_advance(&self) -> bool {
        self.overall_status != OverallStatus::Failed
    }

    pub fn result(&self, rule_id: &str) -> Option<&RuleResult> {
        self.results.iter().find(|r| r.rule_id == rule_id)
    }

    pub fn failures(&self, severity: Severity) -> impl Iterator<Item = &RuleResult> {
        self.results
            .iter()
            .filter(move |r| !r.passed && r.severity == severity)
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.failures(Severity::Error)
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.failures(Severity::Warning)
            .map(|r| r.message.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

pub struct Validator {
    rules: Vec<ValidationRule>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(crate::rules::default_rules())
    }
}

impl Validator {
    pub fn new(rules: Vec<ValidationRule>) -> Self {
        Self { rules }
    }

    /// Run the general rules plus every rule for `phase`.
    ///
    /// A rule that errors is reported as a failed error-severity result; the
    /// remaining rules still run.
    pub fn validate_phase(&self, phase: Phase, ctx: &ValidationContext) -> ValidationReport {
        let results = self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(phase))
            .map(|rule| run_rule(rule, ctx))
            .collect();
        ValidationReport::from_results(phase, &ctx.feature, results)
    }
}

fn run_rule(rule: &ValidationRule, ctx: &ValidationContext) -> RuleResult {
    let fault = match panic::catch_unwind(AssertUnwindSafe(|| (rule.check)(ctx))) {
        Ok(Ok(outcome)) => {
            return RuleResult {
                rule_id: rule.id.to_string(),
                rule_name: rule.name.to_string(),
                severity: rule.severity,
                passed: outcome.passed,
                message: outcome.message,
                suggestions: outcome.suggestions,
                fix: outcome.fix,
            }
        }
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };

    tracing::warn!(rule = rule.id, error = %fault, "validation rule failed to run");
    RuleResult {
        rule_id: rule.id.to_string(),
        rule_name: rule.name.to_string(),
        severity: Severity::Error,
        passed: false,
        message: format!("Rule '{}' could not be evaluated: {fault}", rule.name),
        suggestions: vec!["Check that the spec files are readable and try again".to_string()],
        fix: None,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
