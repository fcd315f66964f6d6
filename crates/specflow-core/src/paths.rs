use crate::error::{Result, SpecflowError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SPECFLOW_DIR: &str = ".specflow";
pub const DEFAULT_SPECS_DIR: &str = ".specflow/specs";

pub const CONFIG_FILE: &str = ".specflow/config.yaml";
pub const STATE_FILE: &str = ".specflow/state.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn specflow_dir(root: &Path) -> PathBuf {
    root.join(SPECFLOW_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

/// Directory holding one feature's phase artifacts.
pub fn spec_dir(root: &Path, specs_dir: &str, feature: &str) -> PathBuf {
    root.join(specs_dir).join(feature)
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(SpecflowError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}
