//! List the policies a run would cover

use colored::Colorize;

use labelsync_core::SyncOptions;

use crate::context::Context;
use crate::error::Result;

/// Run the policies command
pub async fn run_policies(ctx: &Context, json: bool) -> Result<()> {
    let engine = ctx.engine(SyncOptions::from_settings(&ctx.settings))?;
    let policies = engine.discover().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&policies)?);
        return Ok(());
    }

    if policies.is_empty() {
        println!("No policies match the configured filters.");
        return Ok(());
    }

    println!("{}", "Policies".bold());
    println!();
    for summary in &policies {
        let policy = &summary.policy;
        let baseline = if engine.registry_entries(&policy.id)?.is_empty() {
            "no baseline".yellow()
        } else {
            "captured".green()
        };
        println!(
            "  {:<10} {:<40} {} v{} ({})",
            policy.id.cyan(),
            policy.name,
            policy.kind.to_string().dimmed(),
            summary.latest_version,
            baseline
        );
    }
    println!();
    println!("{} policies", policies.len());

    Ok(())
}
