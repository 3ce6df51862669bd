//! Sync command implementation
//!
//! Diffs every selected policy against the registry and reconciles the
//! original-rule-id labels on the server.

use colored::Colorize;

use labelsync_core::{ReconcileMode, SyncOptions};

use super::report::print_report;
use crate::context::Context;
use crate::error::{CliError, Result};

/// Flags of the sync command
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncArgs {
    pub override_labels: bool,
    pub dry_run: bool,
    pub concurrency: Option<usize>,
    pub json: bool,
}

impl SyncArgs {
    /// Merge the flags over the options from the settings file
    fn options(&self, base: SyncOptions) -> SyncOptions {
        SyncOptions {
            mode: if self.override_labels {
                ReconcileMode::Override
            } else {
                base.mode
            },
            concurrency: self.concurrency.unwrap_or(base.concurrency),
            dry_run: base.dry_run || self.dry_run,
        }
    }
}

/// Run the sync command
pub async fn run_sync(ctx: &Context, args: SyncArgs) -> Result<()> {
    let options = args.options(SyncOptions::from_settings(&ctx.settings));
    let engine = ctx.engine(options)?;
    super::abort_on_ctrl_c(engine.abort_flag());

    if !args.json {
        println!(
            "{} Synchronizing rule labels ({} mode, {} workers){}...",
            "=>".blue().bold(),
            options.mode,
            options.concurrency,
            if options.dry_run { ", dry run" } else { "" }
        );
    }

    let report = engine.sync().await?;

    if args.json {
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
