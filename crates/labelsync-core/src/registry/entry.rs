//! Registry entry type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The first rule id observed for a (policy, derived key) pair
///
/// Once written, `rule_id` is never overwritten, so it keeps the original
/// identity even after the platform reassigns ids to the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub policy_id: String,
    /// Policy name at the time the entry was recorded
    #[serde(default)]
    pub policy_name: String,
    pub derived_key: String,
    pub rule_id: String,
    /// Rule kind string (measurement or reconciliation type)
    #[serde(default)]
    pub rule_kind: String,
    /// When the key was first observed
    pub first_seen: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn new(
        policy_id: impl Into<String>,
        derived_key: impl Into<String>,
        rule_id: impl Into<String>,
    ) -> Self {
        Self {
            policy_id: policy_id.into(),
            policy_name: String::new(),
            derived_key: derived_key.into(),
            rule_id: rule_id.into(),
            rule_kind: String::new(),
            first_seen: Utc::now(),
        }
    }

    pub fn with_policy_name(mut self, name: impl Into<String>) -> Self {
        self.policy_name = name.into();
        self
    }

    pub fn with_rule_kind(mut self, kind: impl Into<String>) -> Self {
        self.rule_kind = kind.into();
        self
    }
}
