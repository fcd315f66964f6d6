use crate::output::{checkbox, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use specflow_core::{
    clock::SystemClock,
    graph::TaskGraph,
    parser::parse_tasks_file,
    recommend::next_recommended_task,
    task::{self as task_ops, Task},
    workflow::{AutoConfirm, Outcome, Workflow},
};
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// List tasks for the active feature
    List,
    /// Show the recommended next task
    Next,
    /// Show full details for a single task
    Show { task_id: String },
    /// Mark a task as completed
    Complete { task_id: String },
    /// Mark a completed task as not done
    Reopen { task_id: String },
    /// Print the implementation prompt for a task that can run now
    Run { task_id: String },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let clock = SystemClock;
    let mut workflow = Workflow::load(root, &config, &clock, &AutoConfirm)
        .context("failed to load workflow state")?;

    match subcmd {
        TaskSubcommand::List => list(&workflow, json),
        TaskSubcommand::Next => next(&workflow, json),
        TaskSubcommand::Show { task_id } => show(&workflow, &task_id, json),
        TaskSubcommand::Complete { task_id } => set_status(&workflow, &task_id, true, json),
        TaskSubcommand::Reopen { task_id } => set_status(&workflow, &task_id, false, json),
        TaskSubcommand::Run { task_id } => execute(&mut workflow, &task_id, json),
    }
}

fn load_tasks(workflow: &Workflow) -> anyhow::Result<Vec<Task>> {
    Ok(parse_tasks_file(&workflow.tasks_path()?))
}

fn state_label(graph: &TaskGraph, task: &Task) -> &'static str {
    if task.completed {
        "done"
    } else if graph.can_execute(task) {
        "available"
    } else {
        "blocked"
    }
}

fn list(workflow: &Workflow, json: bool) -> anyhow::Result<()> {
    let tasks = load_tasks(workflow)?;
    let graph = TaskGraph::new(&tasks);

    if json {
        let items: Vec<_> = tasks
            .iter()
            .map(|t| {
                serde_json::json!({
                    "task": t,
                    "status": graph.dependency_status(&t.id),
                })
            })
            .collect();
        print_json(&items)?;
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let rows = tasks
        .iter()
        .map(|t| {
            let indent = if t.is_sub_task() { "  " } else { "" };
            vec![
                checkbox(t.completed).to_string(),
                format!("{indent}{}", t.id),
                state_label(&graph, t).to_string(),
                format!("{indent}{}", t.title),
                t.dependencies.join(", "),
            ]
        })
        .collect();
    print_table(&["", "ID", "STATE", "TITLE", "DEPENDS ON"], rows);
    println!("\n{}", task_ops::summarize(&tasks));
    Ok(())
}

fn next(workflow: &Workflow, json: bool) -> anyhow::Result<()> {
    let tasks = load_tasks(workflow)?;
    let next = next_recommended_task(&tasks);

    if json {
        print_json(&serde_json::json!({ "next": next }))?;
        return Ok(());
    }

    match next {
        Some(t) => println!("{}: {}", t.id, t.title),
        None if !tasks.is_empty() && tasks.iter().all(|t| t.completed) => {
            println!("All tasks completed.")
        }
        None => println!("No task is available to work on."),
    }
    Ok(())
}

fn show(workflow: &Workflow, task_id: &str, json: bool) -> anyhow::Result<()> {
    let tasks = load_tasks(workflow)?;
    let task = task_ops::find(&tasks, task_id)?;
    let graph = TaskGraph::new(&tasks);
    let status = graph.dependency_status(task_id);

    if json {
        print_json(&serde_json::json!({ "task": task, "status": status }))?;
        return Ok(());
    }

    println!("{} {}: {}", checkbox(task.completed), task.id, task.title);
    println!("State:        {}", state_label(&graph, task));
    println!("Line:         {}", task.line);
    if let Some(parent) = &task.parent_task_id {
        println!("Parent:       {parent}");
    }
    if !task.sub_tasks.is_empty() {
        println!("Sub-tasks:    {}", task.sub_tasks.join(", "));
    }
    if !task.requirements.is_empty() {
        println!("Requirements: {}", task.requirements.join(", "));
    }
    if !task.dependencies.is_empty() {
        println!("Depends on:   {}", task.dependencies.join(", "));
    }
    if !task.context_files.is_empty() {
        println!("Context:      {}", task.context_files.join(", "));
    }
    if let Some(status) = status {
        if !status.blocked_by.is_empty() {
            println!("Blocked by:   {}", status.blocked_by.join(", "));
        }
        if !status.enables.is_empty() {
            println!("Enables:      {}", status.enables.join(", "));
        }
    }
    Ok(())
}

fn set_status(
    workflow: &Workflow,
    task_id: &str,
    completed: bool,
    json: bool,
) -> anyhow::Result<()> {
    let tasks = workflow
        .update_task_status(task_id, completed)
        .with_context(|| format!("failed to update task '{task_id}'"))?;

    if json {
        print_json(&serde_json::json!({
            "task_id": task_id,
            "completed": completed,
            "summary": task_ops::summarize(&tasks),
        }))?;
    } else {
        let verb = if completed { "Completed" } else { "Reopened" };
        println!("{verb} {task_id}");
        println!("{}", task_ops::summarize(&tasks));
    }
    Ok(())
}

fn execute(workflow: &mut Workflow, task_id: &str, json: bool) -> anyhow::Result<()> {
    let prompt = match workflow.execute_task(task_id)? {
        Outcome::Done(p) => p,
        Outcome::Rejected(r) => anyhow::bail!(r),
    };

    if json {
        print_json(&prompt)?;
    } else {
        println!("{}\n\n{}", prompt.title, prompt.body);
    }
    Ok(())
}
