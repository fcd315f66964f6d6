use crate::error::{Result, SpecflowError};
use crate::paths;
use crate::types::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// PhaseEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub feature: String,
    pub phase: Phase,
    pub entered: DateTime<Utc>,
    pub exited: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// The current feature and phase, persisted to `.specflow/state.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub current_feature: Option<String>,
    #[serde(default = "default_phase")]
    pub current_phase: Phase,
    #[serde(default)]
    pub phase_history: Vec<PhaseEntry>,
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

fn default_phase() -> Phase {
    Phase::Requirements
}

impl WorkflowState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: 1,
            current_feature: None,
            current_phase: Phase::Requirements,
            phase_history: Vec::new(),
            last_updated: now,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::state_path(root);
        if !path.exists() {
            return Err(SpecflowError::NotInitialized);
        }
        let data = crate::io::read_text(&path)?;
        let state: WorkflowState = serde_yaml::from_str(&data)?;
        Ok(state)
    }

    pub fn load_or_new(root: &Path, now: DateTime<Utc>) -> Result<Self> {
        match Self::load(root) {
            Err(SpecflowError::NotInitialized) => Ok(Self::new(now)),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::state_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Make `feature` current at the requirements phase.
    pub fn begin(&mut self, feature: &str, now: DateTime<Utc>) {
        self.close_current(now);
        self.current_feature = Some(feature.to_string());
        self.current_phase = Phase::Requirements;
        self.phase_history.push(PhaseEntry {
            feature: feature.to_string(),
            phase: Phase::Requirements,
            entered: now,
            exited: None,
        });
        self.last_updated = now;
    }

    pub fn enter(&mut self, phase: Phase, now: DateTime<Utc>) {
        self.close_current(now);
        self.current_phase = phase;
        if let Some(feature) = &self.current_feature {
            self.phase_history.push(PhaseEntry {
                feature: feature.clone(),
                phase,
                entered: now,
                exited: None,
            });
        }
        self.last_updated = now;
    }

    fn close_current(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.phase_history.last_mut() {
            if last.exited.is_none() {
                last.exited = Some(now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn history_tracks_phase_changes() {
        let t0 = Utc::now();
        let mut state = WorkflowState::new(t0);
        state.begin("auth", t0);
        state.enter(Phase::Design, t0);

        assert_eq!(state.current_phase, Phase::Design);
        assert_eq!(state.phase_history.len(), 2);
        assert_eq!(state.phase_history[0].exited, Some(t0));
        assert!(state.phase_history[1].exited.is_none());
    }

    #[test]
    fn begin_resets_phase() {
        let t0 = Utc::now();
        let mut state = WorkflowState::new(t0);
        state.begin("auth", t0);
        state.enter(Phase::Tasks, t0);
        state.begin("billing", t0);
        assert_eq!(state.current_feature.as_deref(), Some("billing"));
        assert_eq!(state.current_phase, Phase::Requirements);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let t0 = Utc::now();
        let mut state = WorkflowState::new(t0);
        state.begin("auth", t0);
        state.save(dir.path()).unwrap();

        let loaded = WorkflowState::load(dir.path()).unwrap();
        assert_eq!(loaded.current_feature.as_deref(), Some("auth"));
        assert_eq!(loaded.current_phase, Phase::Requirements);
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            WorkflowState::load(dir.path()),
            Err(SpecflowError::NotInitialized)
        ));
        assert!(WorkflowState::load_or_new(dir.path(), Utc::now())
            .unwrap()
            .current_feature
            .is_none());
    }
}
