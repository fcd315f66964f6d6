use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecflowError {
    #[error("not initialized: run 'specflow init'")]
    NotInitialized,

    #[error("no active workflow: run 'specflow start <feature>'")]
    NoActiveFeature,

    #[error("invalid feature name '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("failed to access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SpecflowError>;

// ---------------------------------------------------------------------------
// Recovery actions
// ---------------------------------------------------------------------------

/// A recovery step a host can offer when a file operation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    CreateFile(PathBuf),
    CheckPermissions(PathBuf),
    Retry,
}

impl SpecflowError {
    /// Wrap an IO error with the path it was raised for.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpecflowError::File {
            path: path.into(),
            source,
        }
    }

    pub fn recovery_actions(&self) -> Vec<RecoveryAction> {
        match self {
            SpecflowError::File { path, source } => match source.kind() {
                std::io::ErrorKind::NotFound => {
                    vec![RecoveryAction::CreateFile(path.clone()), RecoveryAction::Retry]
                }
                std::io::ErrorKind::PermissionDenied => {
                    vec![RecoveryAction::CheckPermissions(path.clone())]
                }
                _ => vec![RecoveryAction::Retry],
            },
            SpecflowError::Io(_) => vec![RecoveryAction::Retry],
            _ => Vec::new(),
        }
    }
}
