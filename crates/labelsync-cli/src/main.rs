//! labelsync CLI
//!
//! Keeps original rule identities attached as labels across policy versions
//! on the catalog platform.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose)?;
    tracing::debug!(config = %cli.config.display(), "starting labelsync");

    // init writes the settings file, so it must not require a readable one
    if let Commands::Init { force } = cli.command {
        return commands::run_init(&cli, force);
    }

    let ctx = Context::load(&cli)?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Policies { json } => commands::run_policies(&ctx, json).await,
        Commands::Capture { dry_run, json } => commands::run_capture(&ctx, dry_run, json).await,
        Commands::Sync {
            override_labels,
            dry_run,
            concurrency,
            json,
        } => {
            let options = commands::SyncArgs {
                override_labels,
                dry_run,
                concurrency,
                json,
            };
            commands::run_sync(&ctx, options).await
        }
        Commands::Registry { policy, json } => {
            commands::run_registry(&ctx, policy.as_deref(), json)
        }
    }
}
