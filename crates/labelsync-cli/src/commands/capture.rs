//! Baseline capture command

use colored::Colorize;

use labelsync_core::SyncOptions;

use super::report::print_report;
use crate::context::Context;
use crate::error::{CliError, Result};

/// Run the capture command
///
/// Records version 1 of every selected policy in the registry.
pub async fn run_capture(ctx: &Context, dry_run: bool, json: bool) -> Result<()> {
    let mut options = SyncOptions::from_settings(&ctx.settings);
    options.dry_run |= dry_run;

    let engine = ctx.engine(options)?;
    super::abort_on_ctrl_c(engine.abort_flag());

    if !json {
        println!(
            "{} Capturing baselines into {}...",
            "=>".blue().bold(),
            ctx.registry_path().display()
        );
    }

    let report = engine.capture().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        return Err(CliError::user(format!(
            "{} of {} policies failed",
            report.totals.failed, report.totals.policies
        )));
    }
    Ok(())
}
