//! Init command implementation
//!
//! Writes a settings file with default values and any `--base-url` or
//! `--registry` given on the command line.

use colored::Colorize;

use labelsync_core::Settings;

use crate::cli::Cli;
use crate::context::apply_overrides;
use crate::error::{CliError, Result};

/// Run the init command
pub fn run_init(cli: &Cli, force: bool) -> Result<()> {
    let path = &cli.config;
    if path.exists() && !force {
        return Err(CliError::user(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }

    println!(
        "{} Writing default settings to {}...",
        "=>".blue().bold(),
        path.display().to_string().cyan()
    );

    let mut settings = Settings::default();
    apply_overrides(cli, &mut settings);
    settings.save(path)?;

    println!("{} Settings written.", "OK".green().bold());
    if settings.platform.base_url.is_empty() {
        println!(
            "   Set {} before running {}.",
            "platform.base_url".yellow(),
            "labelsync sync".cyan()
        );
    }
    println!(
        "   Credentials are read from {} and {}.",
        "LABELSYNC_ACCESS_KEY".yellow(),
        "LABELSYNC_SECRET_KEY".yellow()
    );
    Ok(())
}
