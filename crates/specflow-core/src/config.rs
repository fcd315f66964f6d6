use crate::error::{Result, SpecflowError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ValidationConfig
// ---------------------------------------------------------------------------

/// Thresholds used by the phase validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_requirement_words")]
    pub min_requirement_words: usize,
    #[serde(default = "default_min_tasks")]
    pub min_tasks: usize,
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
}

fn default_min_requirement_words() -> usize {
    200
}

fn default_min_tasks() -> usize {
    3
}

fn default_max_tasks() -> usize {
    20
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_requirement_words: default_min_requirement_words(),
            min_tasks: default_min_tasks(),
            max_tasks: default_max_tasks(),
        }
    }
}

// ---------------------------------------------------------------------------
// DebounceConfig
// ---------------------------------------------------------------------------

/// Minimum spacing between repeated invocations, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebounceConfig {
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
    #[serde(default = "default_task_ms")]
    pub task_ms: u64,
    #[serde(default = "default_start_ms")]
    pub start_ms: u64,
}

fn default_transition_ms() -> u64 {
    1000
}

fn default_task_ms() -> u64 {
    1000
}

fn default_start_ms() -> u64 {
    2000
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            transition_ms: default_transition_ms(),
            task_ms: default_task_ms(),
            start_ms: default_start_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_specs_dir")]
    pub specs_dir: String,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub debounce: DebounceConfig,
}

fn default_version() -> u32 {
    1
}

fn default_specs_dir() -> String {
    paths::DEFAULT_SPECS_DIR.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            specs_dir: default_specs_dir(),
            validation: ValidationConfig::default(),
            debounce: DebounceConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SpecflowError::NotInitialized);
        }
        let data = crate::io::read_text(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load the project config, falling back to defaults when none exists.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(SpecflowError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn spec_dir(&self, root: &Path, feature: &str) -> std::path::PathBuf {
        paths::spec_dir(root, &self.specs_dir, feature)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.specs_dir.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "specs_dir must not be empty".to_string(),
            });
        }

        if self.validation.min_tasks > self.validation.max_tasks {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "validation.min_tasks ({}) is greater than validation.max_tasks ({})",
                    self.validation.min_tasks, self.validation.max_tasks
                ),
            });
        }

        if self.debounce.transition_ms > 60_000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "debounce.transition_ms={} (>60s is unusual)",
                    self.debounce.transition_ms
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
