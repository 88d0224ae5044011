//! Terminal output formatting

use colored::Colorize;
use gsm_engine::{ActionPlan, TickOutcome, TickReport};
use std::io::Write;
use tabwriter::TabWriter;

/// Render a plan as an aligned table, one action per row.
pub fn format_plan(plan: &ActionPlan) -> String {
    if plan.is_empty() {
        return "no drift detected\n".to_string();
    }

    let mut tw = TabWriter::new(Vec::new());
    let _ = writeln!(tw, "ACTION\tSUBJECT\tFROM\tTO");
    for action in plan.iter() {
        let _ = writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            action.kind,
            action.subject.id,
            action.from_version.as_deref().unwrap_or("(none)"),
            action.to_version
        );
    }
    let _ = tw.flush();
    String::from_utf8(tw.into_inner().unwrap_or_default()).unwrap_or_default()
}

/// One-line colored summary of a tick.
pub fn format_report(report: &TickReport) -> String {
    let outcome = match &report.outcome {
        TickOutcome::NoDrift => "no drift".green().to_string(),
        TickOutcome::Applied { subjects } => format!(
            "{}: {}",
            "applied".green().bold(),
            join(subjects.iter().map(|s| s.to_string()))
        ),
        TickOutcome::ApplyFailed {
            applied, failed, ..
        } => format!(
            "{}: {} (applied: {})",
            "apply failed".red().bold(),
            failed,
            if applied.is_empty() {
                "none".to_string()
            } else {
                join(applied.iter().map(|s| s.to_string()))
            }
        ),
        TickOutcome::CrashRecovered => "crash recovered".yellow().bold().to_string(),
        TickOutcome::StartupTimeout => "startup timeout".red().bold().to_string(),
        TickOutcome::PlanOnly => format!("dry run: {} pending action(s)", report.plan.len()),
    };
    format!(
        "{} (server: {} -> {})",
        outcome, report.state_before, report.state_after
    )
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(", ")
}
