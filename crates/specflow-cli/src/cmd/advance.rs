use crate::output::print_json;
use anyhow::Context;
use specflow_core::{
    clock::SystemClock,
    types::Phase,
    validation::ValidationReport,
    workflow::{AutoConfirm, Confirm, Outcome, Workflow},
};
use std::io::{BufRead, Write};
use std::path::Path;

/// Asks on stderr and reads a y/N answer from stdin. EOF counts as "no".
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, from: Phase, to: Phase, report: &ValidationReport) -> bool {
        let mut err = std::io::stderr();
        let _ = write!(
            err,
            "{} phase validated ({}). Move from {from} to {to}? [y/N] ",
            from, report.overall_status
        );
        let _ = err.flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

pub fn run(root: &Path, yes: bool, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let clock = SystemClock;
    let confirm: &dyn Confirm = if yes { &AutoConfirm } else { &StdinConfirm };
    let mut workflow = Workflow::load(root, &config, &clock, confirm)
        .context("failed to load workflow state")?;

    let advance = match workflow.move_to_next_phase()? {
        Outcome::Done(a) => a,
        Outcome::Rejected(r) => anyhow::bail!(r),
    };

    if json {
        print_json(&advance)?;
    } else {
        for w in &advance.warnings {
            println!("warning: {w}");
        }
        println!("Moved from {} to {}.\n", advance.from, advance.to);
        println!("{}\n\n{}", advance.prompt.title, advance.prompt.body);
    }
    Ok(())
}
