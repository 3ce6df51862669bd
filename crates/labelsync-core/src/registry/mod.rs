//! Rule registry: the durable memory of first-seen rule identity
//!
//! The registry maps `(policy id, derived key)` to the rule id captured when
//! that key was first observed. It is append-only: entries are never
//! overwritten or deleted. It persists as a TOML file. Saving re-reads the
//! file under an exclusive lock and merges, so entries persisted by another
//! handle or process survive; on conflict the entry already on disk wins.

mod entry;

pub use entry::RegistryEntry;

use crate::model::{Policy, RuleRecord};
use crate::{Error, Result};
use labelsync_fs::io;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

const REGISTRY_VERSION: &str = "1.0";

/// Persisted mapping of (policy, derived key) to original rule id
#[derive(Debug, Serialize, Deserialize)]
pub struct RuleRegistry {
    /// Registry format version
    version: String,
    /// All entries, in insertion order
    #[serde(default)]
    entries: Vec<RegistryEntry>,
    /// Path to registry file (not serialized)
    #[serde(skip)]
    path: PathBuf,
    /// policy id -> derived key -> position in `entries`
    #[serde(skip)]
    index: HashMap<String, BTreeMap<String, usize>>,
    /// Entries recorded since the last load or save
    #[serde(skip)]
    pending: usize,
}

impl RuleRegistry {
    /// Create a new empty registry at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            version: REGISTRY_VERSION.to_string(),
            entries: Vec::new(),
            path: path.into(),
            index: HashMap::new(),
            pending: 0,
        }
    }

    /// Load registry from a TOML file under a shared lock
    ///
    /// If the file holds more than one entry for the same policy and key,
    /// the earliest one is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = io::read_text(&path)?;
        let stored = Self::parse(&content)?;

        let mut registry = Self::new(path);
        registry.version = stored.version;
        registry.absorb(stored.entries);

        tracing::debug!(
            path = %registry.path.display(),
            entries = registry.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// Load registry or create new if it doesn't exist
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new(path))
        }
    }

    /// Merge this registry into its file and adopt the merged result
    ///
    /// # Errors
    ///
    /// Returns an error if the registry has no path, or the file cannot be
    /// locked, read, parsed or written.
    pub fn save(&mut self) -> Result<()> {
        let persisted = Self::persist(&self.path, &self.entries)?;
        self.absorb_persisted(persisted);
        Ok(())
    }

    /// Merge `entries` into the registry file at `path`.
    ///
    /// The file is read, merged and rewritten under one exclusive lock.
    /// Entries already in the file win over `entries` for the same policy
    /// and key. Returns every entry the file now holds.
    pub fn persist(path: &Path, entries: &[RegistryEntry]) -> Result<Vec<RegistryEntry>> {
        if path.as_os_str().is_empty() {
            return Err(Error::Registry {
                message: "registry has no file path".to_string(),
            });
        }

        let mut merged = Self::new(path);
        io::update_text(path, |current| -> Result<String> {
            if let Some(content) = current {
                merged.absorb(Self::parse(&content)?.entries);
            }
            merged.absorb(entries.iter().cloned());
            Ok(toml::to_string_pretty(&merged)?)
        })?;

        tracing::debug!(path = %path.display(), entries = merged.len(), "registry saved");
        Ok(merged.entries)
    }

    /// Adopt entries returned by [`RuleRegistry::persist`]
    ///
    /// Persisted entries replace in-memory ones for the same key; entries
    /// recorded since the snapshot was taken are kept and stay pending.
    pub fn absorb_persisted(&mut self, persisted: Vec<RegistryEntry>) {
        let local = std::mem::take(&mut self.entries);
        self.index.clear();
        self.absorb(persisted);
        self.pending = 0;
        for entry in local {
            self.insert(entry);
        }
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Insert entries in order, first one wins; not counted as pending
    fn absorb(&mut self, entries: impl IntoIterator<Item = RegistryEntry>) {
        for entry in entries {
            if !self.insert(entry.clone()) {
                tracing::debug!(
                    policy_id = %entry.policy_id,
                    key = %entry.derived_key,
                    "duplicate registry entry ignored"
                );
            }
        }
        self.pending = 0;
    }

    /// Get the registry file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries recorded since the last load or save
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Ids of every policy with at least one entry
    pub fn policy_ids(&self) -> BTreeSet<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    /// Whether the policy has any entry (i.e. its baseline was captured)
    pub fn has_policy(&self, policy_id: &str) -> bool {
        self.index.contains_key(policy_id)
    }

    /// Entries of one policy, ordered by derived key
    pub fn policy_entries(&self, policy_id: &str) -> Vec<&RegistryEntry> {
        self.index
            .get(policy_id)
            .map(|keys| keys.values().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Derived keys known for one policy
    pub fn policy_keys(&self, policy_id: &str) -> BTreeSet<String> {
        self.index
            .get(policy_id)
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Look up the entry for a policy and key
    pub fn get(&self, policy_id: &str, derived_key: &str) -> Option<&RegistryEntry> {
        let position = self.index.get(policy_id)?.get(derived_key)?;
        Some(&self.entries[*position])
    }

    /// Record a rule id for a key unless the key is already known.
    ///
    /// Returns true if the entry was inserted. An existing entry is never
    /// modified.
    pub fn record_if_absent(&mut self, policy_id: &str, derived_key: &str, rule_id: &str) -> bool {
        self.insert(RegistryEntry::new(policy_id, derived_key, rule_id))
    }

    /// Record a keyed rule with its policy name and kind.
    ///
    /// Same semantics as [`RuleRegistry::record_if_absent`].
    pub fn record_rule(&mut self, policy: &Policy, rule: &RuleRecord) -> bool {
        self.insert(
            RegistryEntry::new(&policy.id, &rule.derived_key, &rule.rule_id)
                .with_policy_name(&policy.name)
                .with_rule_kind(rule.kind.as_str()),
        )
    }

    fn insert(&mut self, entry: RegistryEntry) -> bool {
        let keys = self.index.entry(entry.policy_id.clone()).or_default();
        if keys.contains_key(&entry.derived_key) {
            return false;
        }
        keys.insert(entry.derived_key.clone(), self.entries.len());
        self.entries.push(entry);
        self.pending += 1;
        true
    }
}
