//! Settings resolution and construction of the client, registry and engine

use std::path::{Path, PathBuf};
use std::sync::Arc;

use labelsync_client::{CatalogClient, Credentials};
use labelsync_core::{RuleRegistry, Settings, SyncEngine, SyncOptions};

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Everything a command needs, resolved from the settings file and flags
#[derive(Debug)]
pub struct Context {
    pub settings: Settings,
    config_path: PathBuf,
    access_key: Option<String>,
    secret_key: Option<String>,
}

impl Context {
    /// Load the settings file (defaults when absent) and apply flag overrides
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut settings = Settings::load_or_default(&cli.config)?;
        apply_overrides(cli, &mut settings);

        Ok(Self {
            settings,
            config_path: cli.config.clone(),
            access_key: non_empty(cli.access_key.as_deref()),
            secret_key: non_empty(cli.secret_key.as_deref()),
        })
    }

    pub fn registry_path(&self) -> &Path {
        &self.settings.sync.registry_path
    }

    /// Load the registry, or start an empty one if the file does not exist
    pub fn open_registry(&self) -> Result<RuleRegistry> {
        Ok(RuleRegistry::load_or_create(self.registry_path())?)
    }

    fn credentials(&self) -> Result<Credentials> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Ok(Credentials::new(access, secret)),
            _ => Err(CliError::user(
                "API credentials missing: set --access-key and --secret-key \
                 (or LABELSYNC_ACCESS_KEY and LABELSYNC_SECRET_KEY)",
            )),
        }
    }

    /// Build the HTTP client after validating the settings
    pub fn client(&self) -> Result<CatalogClient> {
        self.settings.validate().map_err(|e| {
            CliError::user(format!("{} (settings file: {})", e, self.config_path.display()))
        })?;
        let credentials = self.credentials()?;
        Ok(CatalogClient::from_settings(&self.settings, credentials)?)
    }

    /// Build an engine over the HTTP client and the on-disk registry
    pub fn engine(&self, options: SyncOptions) -> Result<SyncEngine> {
        if options.concurrency == 0 {
            return Err(CliError::user("concurrency must be at least 1"));
        }
        let client = self.client()?;
        let registry = self.open_registry()?;
        Ok(SyncEngine::new(
            Arc::new(client),
            registry,
            self.settings.filters.clone(),
            options,
        ))
    }
}

/// Apply the settings that flags and environment variables can override
pub fn apply_overrides(cli: &Cli, settings: &mut Settings) {
    if let Some(base_url) = &cli.base_url {
        settings.platform.base_url = base_url.clone();
    }
    if let Some(registry) = &cli.registry {
        settings.sync.registry_path = registry.clone();
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn flags_override_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("labelsync.toml");
        fs::write(
            &config,
            "[platform]\nbase_url = \"https://from-file.example.com\"\n\n[sync]\nconcurrency = 2\n",
        )
        .unwrap();

        let cli = parse(&[
            "labelsync",
            "--config",
            config.to_str().unwrap(),
            "--base-url",
            "https://from-flag.example.com",
            "--registry",
            "other.toml",
            "policies",
        ]);
        let ctx = Context::load(&cli).unwrap();

        assert_eq!(ctx.settings.platform.base_url, "https://from-flag.example.com");
        assert_eq!(ctx.settings.sync.concurrency, 2);
        assert_eq!(ctx.registry_path(), Path::new("other.toml"));
    }

    #[test]
    fn missing_settings_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("absent.toml");
        let cli = parse(&["labelsync", "--config", config.to_str().unwrap(), "policies"]);

        let ctx = Context::load(&cli).unwrap();
        assert_eq!(ctx.settings, Settings::default());
    }

    #[test]
    fn client_requires_credentials() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("absent.toml");
        let cli = parse(&[
            "labelsync",
            "--config",
            config.to_str().unwrap(),
            "--base-url",
            "https://catalog.example.com",
            "--access-key",
            "  ",
            "policies",
        ]);

        let ctx = Context::load(&cli).unwrap();
        let err = ctx.client().unwrap_err();
        assert!(err.to_string().contains("credentials"), "got: {}", err);
    }
}
