//! Registry inspection command

use colored::Colorize;

use labelsync_core::RegistryEntry;

use crate::context::Context;
use crate::error::Result;

/// Run the registry command
///
/// Reads the registry file only; no platform access or credentials needed.
pub fn run_registry(ctx: &Context, policy: Option<&str>, json: bool) -> Result<()> {
    let registry = ctx.open_registry()?;
    let mut entries: Vec<&RegistryEntry> = match policy {
        Some(id) => registry.policy_entries(id),
        None => registry.entries().iter().collect(),
    };
    entries.sort_by(|a, b| {
        (a.policy_id.as_str(), a.derived_key.as_str())
            .cmp(&(b.policy_id.as_str(), b.derived_key.as_str()))
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!(
            "No registry entries in {}.",
            registry.path().display().to_string().cyan()
        );
        return Ok(());
    }

    println!("{}", registry.path().display().to_string().bold());
    let mut current: Option<&str> = None;
    for entry in &entries {
        if current != Some(entry.policy_id.as_str()) {
            println!();
            println!(
                "{} {}",
                entry.policy_id.cyan().bold(),
                entry.policy_name.dimmed()
            );
            current = Some(entry.policy_id.as_str());
        }
        println!(
            "  {} -> {} {}",
            entry.derived_key,
            entry.rule_id.green(),
            entry.rule_kind.dimmed()
        );
    }
    println!();
    println!("{} entries", entries.len());

    Ok(())
}
