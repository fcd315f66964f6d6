use crate::output::print_json;
use anyhow::Context;
use specflow_core::{
    clock::SystemClock,
    graph::TaskGraph,
    recommend::next_recommended_task,
    task,
    workflow::{AutoConfirm, Workflow},
};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let clock = SystemClock;
    let workflow = Workflow::load(root, &config, &clock, &AutoConfirm)
        .context("failed to load workflow state")?;

    let Some(feature) = workflow.current_feature() else {
        if json {
            print_json(&serde_json::json!({ "feature": null }))?;
        } else {
            println!("No active workflow. Run: specflow start <feature>");
        }
        return Ok(());
    };

    let tasks = workflow.tasks().context("failed to read tasks")?;
    let partition = TaskGraph::new(&tasks).partition();
    let next = next_recommended_task(&tasks);

    if json {
        print_json(&serde_json::json!({
            "feature": feature,
            "phase": workflow.current_phase(),
            "spec_dir": workflow.spec_dir().map(|d| d.display().to_string()),
            "tasks": {
                "total": tasks.len(),
                "completed": partition.completed.len(),
                "available": partition.available.len(),
                "blocked": partition.blocked.len(),
            },
            "next_task": next.map(|t| &t.id),
            "history": workflow.state().phase_history,
        }))?;
        return Ok(());
    }

    println!("Feature: {feature}");
    println!("Phase:   {}", workflow.current_phase());
    if let Some(dir) = workflow.spec_dir() {
        println!("Specs:   {}", dir.display());
    }
    if !tasks.is_empty() {
        println!("Tasks:   {}", task::summarize(&tasks));
    }
    if let Some(t) = next {
        println!("Next:    {}: {}", t.id, t.title);
    }
    Ok(())
}
