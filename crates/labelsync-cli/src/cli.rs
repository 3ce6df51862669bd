//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// labelsync - Keep original rule ids attached to catalog policy rules
#[derive(Parser, Debug)]
#[command(name = "labelsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (.toml, .json or .yaml)
    #[arg(
        short,
        long,
        global = true,
        env = "LABELSYNC_CONFIG",
        default_value = "labelsync.toml"
    )]
    pub config: PathBuf,

    /// Catalog server base URL, overriding the settings file
    #[arg(long, global = true, env = "LABELSYNC_HOST")]
    pub base_url: Option<String>,

    /// API access key
    #[arg(long, global = true, env = "LABELSYNC_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// API secret key
    #[arg(long, global = true, env = "LABELSYNC_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Registry file, overriding the settings file
    #[arg(long, global = true, env = "LABELSYNC_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Write a settings file with default values
    ///
    /// `--base-url` and `--registry` are written into the file. Credentials
    /// never are.
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },

    /// List the policies selected by the configured filters
    Policies {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Record version 1 of every selected policy in the registry
    Capture {
        /// Preview changes without writing the registry
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Diff policies against the registry and reconcile labels
    ///
    /// Examples:
    ///   labelsync sync                       # Add missing labels
    ///   labelsync sync --dry-run             # Preview only
    ///   labelsync sync --override-labels     # Replace every label
    Sync {
        /// Remove all existing labels before re-adding them
        #[arg(long, env = "LABELSYNC_OVERRIDE_LABELS")]
        override_labels: bool,

        /// Preview changes without writing labels or the registry
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of policies processed at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show registry entries
    Registry {
        /// Only show entries for this policy id
        #[arg(long)]
        policy: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
