use crate::output::{print_json, print_table};
use anyhow::Context;
use specflow_core::{
    clock::SystemClock,
    types::Phase,
    validation::ValidationReport,
    workflow::{AutoConfirm, Workflow},
    SpecflowError,
};
use std::path::Path;

pub fn run(root: &Path, phase: Option<Phase>, fix: bool, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(root)?;
    let clock = SystemClock;
    let workflow = Workflow::load(root, &config, &clock, &AutoConfirm)
        .context("failed to load workflow state")?;
    let phase = phase.unwrap_or(workflow.current_phase());

    let mut report = workflow.validate(phase)?;
    let mut applied = Vec::new();

    if fix {
        let feature = workflow
            .current_feature()
            .ok_or(SpecflowError::NoActiveFeature)?;
        let spec_dir = workflow.spec_dir().ok_or(SpecflowError::NoActiveFeature)?;
        for result in report.results.iter().filter(|r| !r.passed) {
            if let Some(remedy) = &result.fix {
                remedy
                    .apply(&spec_dir, feature)
                    .with_context(|| format!("failed to apply fix for {}", result.rule_id))?;
                applied.push(remedy.description.clone());
            }
        }
        if !applied.is_empty() {
            report = workflow.validate(phase)?;
        }
    }

    if json {
        print_json(&serde_json::json!({
            "report": report,
            "fixes_applied": applied,
        }))?;
    } else {
        for description in &applied {
            println!("fixed: {description}");
        }
        if !applied.is_empty() {
            println!();
        }
        print_report(&report);
    }

    if !report.can_advance() {
        anyhow::bail!(
            "{} phase validation failed with {} error(s)",
            report.phase,
            report.error_count
        );
    }
    Ok(())
}

pub fn print_report(report: &ValidationReport) {
    println!(
        "Validation of '{}' ({} phase): {}\n",
        report.feature, report.phase, report.overall_status
    );
    let rows = report
        .results
        .iter()
        .map(|r| {
            vec![
                if r.passed { "ok" } else { "FAIL" }.to_string(),
                r.severity.to_string(),
                r.rule_id.clone(),
                r.message.clone(),
            ]
        })
        .collect();
    print_table(&["STATUS", "SEVERITY", "RULE", "MESSAGE"], rows);

    let hints: Vec<_> = report
        .results
        .iter()
        .filter(|r| !r.passed)
        .flat_map(|r| {
            r.suggestions
                .iter()
                .map(move |s| format!("{}: {s}", r.rule_id))
                .chain(r.fix.iter().map(move |f| {
                    format!("{}: fixable with --fix ({})", r.rule_id, f.description)
                }))
        })
        .collect();
    if !hints.is_empty() {
        println!("\nSuggestions:");
        for h in hints {
            println!("  - {h}");
        }
    }
}
