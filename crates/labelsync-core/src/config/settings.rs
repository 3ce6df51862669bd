//! Settings parsing and validation

use crate::model::PolicyKind;
use crate::reconcile::ReconcileMode;
use crate::{Error, Result};
use labelsync_fs::ConfigStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("labelsync-registry.toml")
}

fn default_concurrency() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    4_000
}

fn default_policy_types() -> BTreeSet<PolicyType> {
    [PolicyType::Standard, PolicyType::Reconciliation]
        .into_iter()
        .collect()
}

/// Policy types selectable in the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    /// Data-quality policies
    Standard,
    /// Reconciliation (equality) policies
    Reconciliation,
}

impl PolicyType {
    pub fn matches(&self, kind: &PolicyKind) -> bool {
        matches!(
            (self, kind),
            (Self::Standard, PolicyKind::DataQuality)
                | (Self::Reconciliation, PolicyKind::Reconciliation)
        )
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Standard => PolicyKind::DataQuality,
            Self::Reconciliation => PolicyKind::Reconciliation,
        }
    }
}

/// Connection settings for the catalog platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Scheme and host, e.g. `https://catalog.example.com`
    #[serde(default)]
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Page size used for policy enumeration
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

/// Which policies a run covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFilter {
    /// Rule status values passed to enumeration (e.g. `ACTIVE`)
    #[serde(default)]
    pub rule_status: BTreeSet<String>,
    /// Policy types to synchronize
    #[serde(default = "default_policy_types")]
    pub policy_types: BTreeSet<PolicyType>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub assembly_ids: Vec<String>,
}

impl Default for PolicyFilter {
    fn default() -> Self {
        Self {
            rule_status: BTreeSet::new(),
            policy_types: default_policy_types(),
            tag: None,
            assembly_ids: Vec::new(),
        }
    }
}

impl PolicyFilter {
    /// Whether a policy of this kind is selected
    pub fn accepts(&self, kind: &PolicyKind) -> bool {
        self.policy_types.iter().any(|t| t.matches(kind))
    }

    /// The tag filter, if set to something other than whitespace
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Sync behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Where the rule registry is stored
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,
    /// Maximum number of policies processed at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Remove all existing labels before re-adding the target set
    #[serde(default)]
    pub override_labels: bool,
    /// Compute plans without writing labels or the registry
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            concurrency: default_concurrency(),
            override_labels: false,
            dry_run: false,
        }
    }
}

/// Retry policy for transient platform failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Complete settings for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub platform: PlatformSettings,
    #[serde(default)]
    pub filters: PolicyFilter,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Settings {
    /// Parse settings from TOML content
    ///
    /// # Example
    ///
    /// ```
    /// use labelsync_core::config::Settings;
    ///
    /// let settings = Settings::parse(r#"
    /// [platform]
    /// base_url = "https://catalog.example.com"
    ///
    /// [sync]
    /// concurrency = 8
    /// "#).unwrap();
    ///
    /// assert_eq!(settings.sync.concurrency, 8);
    /// assert_eq!(settings.platform.page_size, 100);
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Load settings from a `.toml`, `.json` or `.yaml` file
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Load settings from `path` if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no settings file; using defaults");
            Ok(Self::default())
        }
    }

    /// Write settings to `path` in the format its extension names
    pub fn save(&self, path: &Path) -> Result<()> {
        Ok(ConfigStore::new().save(path, self)?)
    }

    /// The reconciliation mode selected by `sync.override_labels`
    pub fn mode(&self) -> ReconcileMode {
        ReconcileMode::from_override_flag(self.sync.override_labels)
    }

    /// Check the settings needed to talk to the platform
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.platform.base_url.trim().is_empty() {
            return invalid("platform.base_url must be set");
        }
        if self.platform.page_size == 0 {
            return invalid("platform.page_size must be at least 1");
        }
        if self.sync.concurrency == 0 {
            return invalid("sync.concurrency must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return invalid("retry.initial_delay_ms must not exceed retry.max_delay_ms");
        }
        if self.filters.policy_types.is_empty() {
            return invalid("filters.policy_types must name at least one type");
        }
        Ok(())
    }
}
