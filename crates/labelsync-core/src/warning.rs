//! Non-fatal conditions reported alongside a policy outcome

use serde::{Deserialize, Serialize};
use std::fmt;

/// A condition that was logged and reported but did not fail the policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncWarning {
    /// A rule lacked an attribute needed to derive its key and was skipped
    MalformedRule { rule_id: String, reason: String },

    /// Two rules in one version derived the same key; the first was kept
    KeyCollision {
        key: String,
        kept_rule_id: String,
        dropped_rule_id: String,
    },

    /// The server carries a label whose value differs from the registry
    RegistryInconsistency {
        key: String,
        registry_value: String,
        server_value: String,
    },

    /// No rule in the latest version carries the label's key
    UnmatchedLabel { key: String },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRule { rule_id, reason } => {
                write!(f, "skipped malformed rule {rule_id}: {reason}")
            }
            Self::KeyCollision {
                key,
                kept_rule_id,
                dropped_rule_id,
            } => write!(
                f,
                "key {key} derived by rules {kept_rule_id} and {dropped_rule_id}; \
                 kept {kept_rule_id}"
            ),
            Self::RegistryInconsistency {
                key,
                registry_value,
                server_value,
            } => write!(
                f,
                "label {key} is {server_value} on the server but {registry_value} \
                 in the registry; left untouched"
            ),
            Self::UnmatchedLabel { key } => {
                write!(f, "no rule in the latest version carries key {key}")
            }
        }
    }
}
