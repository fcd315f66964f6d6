use crate::output::print_json;
use anyhow::Context;
use specflow_core::{
    clock::SystemClock,
    workflow::{AutoConfirm, Outcome, Workflow},
};
use std::path::Path;

pub fn run(root: &Path, feature: &str, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let clock = SystemClock;
    let mut workflow = Workflow::load(root, &config, &clock, &AutoConfirm)
        .context("failed to load workflow state")?;

    match workflow.start_workflow(feature)? {
        Outcome::Done(prompt) => {
            if json {
                print_json(&serde_json::json!({
                    "feature": feature,
                    "phase": prompt.phase,
                    "prompt": prompt,
                }))?;
            } else {
                println!("Started '{feature}' in the {} phase.\n", prompt.phase);
                println!("{}\n\n{}", prompt.title, prompt.body);
            }
            Ok(())
        }
        Outcome::Rejected(r) => anyhow::bail!(r),
    }
}
