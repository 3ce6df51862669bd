//! Human-readable rendering of run reports

use colored::Colorize;

use labelsync_core::{PolicyPhase, RunKind, SyncOutcome, SyncReport};

pub(crate) fn print_report(report: &SyncReport) {
    for outcome in &report.outcomes {
        print_outcome(outcome);
    }

    let totals = &report.totals;
    println!();
    if report.is_success() && !report.was_aborted() {
        println!("{} {} complete:", "OK".green().bold(), report.kind);
    } else if report.is_success() {
        println!("{} {} interrupted:", "ABORTED".yellow().bold(), report.kind);
    } else {
        println!("{} {} finished with failures:", "FAILED".red().bold(), report.kind);
    }

    println!(
        "   {} policies: {} succeeded, {} failed, {} abandoned",
        totals.policies, totals.succeeded, totals.failed, totals.abandoned
    );
    let entries = if report.dry_run {
        "registry entries that would be added"
    } else {
        "registry entries added"
    };
    println!("   {} {}", totals.registry_entries_added, entries);
    if report.kind == RunKind::Sync {
        println!(
            "   labels: {} applied, {} removed, {} skipped",
            totals.labels_applied, totals.labels_removed, totals.labels_skipped
        );
    }
    if totals.warnings > 0 {
        println!("   {} {}", totals.warnings, "warnings".yellow());
    }
    if report.dry_run {
        println!();
        println!("Dry run: nothing was written.");
    }
}

fn print_outcome(outcome: &SyncOutcome) {
    let status = match outcome.phase {
        PolicyPhase::Failed => "FAILED".red().bold(),
        PolicyPhase::Abandoned => "SKIPPED".yellow().bold(),
        _ => "OK".green().bold(),
    };
    println!(
        "{} {} {}",
        status,
        outcome.policy_id.cyan(),
        outcome.policy_name.dimmed()
    );

    for action in &outcome.actions {
        println!("   {} {}", "+".green(), action);
    }
    for warning in &outcome.warnings {
        println!("   {} {}", "!".yellow(), warning);
    }
    if let Some(error) = &outcome.error {
        let after = outcome
            .failed_after
            .map(|phase| format!(" (after {phase})"))
            .unwrap_or_default();
        println!("   {} {}{}", "x".red(), error, after);
    }
}
