use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Requirements,
    Design,
    Tasks,
    Execution,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Requirements,
            Phase::Design,
            Phase::Tasks,
            Phase::Execution,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        Phase::all().get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Requirements => "requirements",
            Phase::Design => "design",
            Phase::Tasks => "tasks",
            Phase::Execution => "execution",
        }
    }

    /// The artifact written during this phase. Execution works off tasks.md.
    pub fn artifact(self) -> ArtifactFile {
        match self {
            Phase::Requirements => ArtifactFile::Requirements,
            Phase::Design => ArtifactFile::Design,
            Phase::Tasks | Phase::Execution => ArtifactFile::Tasks,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::error::SpecflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requirements" => Ok(Phase::Requirements),
            "design" => Ok(Phase::Design),
            "tasks" => Ok(Phase::Tasks),
            "execution" => Ok(Phase::Execution),
            _ => Err(crate::error::SpecflowError::InvalidPhase(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFile {
    Requirements,
    Design,
    Tasks,
}

impl ArtifactFile {
    pub fn all() -> &'static [ArtifactFile] {
        &[
            ArtifactFile::Requirements,
            ArtifactFile::Design,
            ArtifactFile::Tasks,
        ]
    }

    pub fn filename(self) -> &'static str {
        match self {
            ArtifactFile::Requirements => "requirements.md",
            ArtifactFile::Design => "design.md",
            ArtifactFile::Tasks => "tasks.md",
        }
    }
}

impl fmt::Display for ArtifactFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// OverallStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Passed,
    Warning,
    Failed,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallStatus::Passed => "passed",
            OverallStatus::Warning => "warning",
            OverallStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_ordering() {
        assert!(Phase::Requirements < Phase::Design);
        assert!(Phase::Design < Phase::Tasks);
        assert!(Phase::Execution > Phase::Tasks);
    }

    #[test]
    fn phase_next() {
        assert_eq!(Phase::Requirements.next(), Some(Phase::Design));
        assert_eq!(Phase::Tasks.next(), Some(Phase::Execution));
        assert_eq!(Phase::Execution.next(), None);
    }

    #[test]
    fn phase_parses_from_str() {
        use std::str::FromStr;
        for phase in Phase::all() {
            assert_eq!(Phase::from_str(phase.as_str()).unwrap(), *phase);
        }
        assert!(Phase::from_str("review").is_err());
    }

    #[test]
    fn execution_works_off_tasks_artifact() {
        assert_eq!(Phase::Execution.artifact(), ArtifactFile::Tasks);
        assert_eq!(Phase::Design.artifact().filename(), "design.md");
    }
}
