use crate::output::print_json;
use anyhow::Context;
use specflow_core::{
    clock::{Clock, SystemClock},
    config::Config,
    io, paths,
    state::WorkflowState,
};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let dir = paths::specflow_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_created = !paths::config_path(root).exists();
    let config = if config_created {
        let cfg = Config::default();
        cfg.save(root).context("failed to write config.yaml")?;
        cfg
    } else {
        Config::load(root).context("failed to read existing config.yaml")?
    };

    let specs = root.join(&config.specs_dir);
    io::ensure_dir(&specs).with_context(|| format!("failed to create {}", specs.display()))?;

    let state_created = !paths::state_path(root).exists();
    if state_created {
        WorkflowState::new(SystemClock.now())
            .save(root)
            .context("failed to write state.yaml")?;
    }

    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "config_created": config_created,
            "state_created": state_created,
        }))?;
    } else {
        println!("Initializing specflow in: {}", root.display());
        for (name, created) in [
            ("config.yaml", config_created),
            ("state.yaml", state_created),
        ] {
            let label = if created { "created:" } else { "exists: " };
            println!("  {label} {}/{name}", paths::SPECFLOW_DIR);
        }
        println!("\nNext: specflow start <feature>");
    }
    Ok(())
}
