//! Policy identity and kind

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform type string for data-quality policies
pub const DATA_QUALITY_TYPE: &str = "DATA_QUALITY";

/// Platform type string for reconciliation policies
pub const RECONCILIATION_TYPE: &str = "EQUALITY";

/// The kind of a policy, as reported by the platform's `type` field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyKind {
    /// Standard data-quality policy whose rules are measurement items
    DataQuality,
    /// Reconciliation policy whose rules are left/right column mappings
    Reconciliation,
    /// Any other policy type; enumerated but never synchronized
    Other(String),
}

impl PolicyKind {
    /// Map a platform type string onto a policy kind
    pub fn from_platform_type(value: &str) -> Self {
        match value {
            DATA_QUALITY_TYPE => Self::DataQuality,
            RECONCILIATION_TYPE => Self::Reconciliation,
            other => Self::Other(other.to_string()),
        }
    }

    /// The platform type string for this kind
    pub fn platform_type(&self) -> &str {
        match self {
            Self::DataQuality => DATA_QUALITY_TYPE,
            Self::Reconciliation => RECONCILIATION_TYPE,
            Self::Other(other) => other,
        }
    }

    /// Whether labelsync knows how to read and label this kind of policy
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for PolicyKind {
    fn from(value: String) -> Self {
        Self::from_platform_type(&value)
    }
}

impl From<PolicyKind> for String {
    fn from(kind: PolicyKind) -> Self {
        kind.platform_type().to_string()
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform_type())
    }
}

/// A policy under management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    pub kind: PolicyKind,
}

impl Policy {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PolicyKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// A policy as returned by enumeration, with its latest version number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySummary {
    #[serde(flatten)]
    pub policy: Policy,
    pub latest_version: u32,
}

impl PolicySummary {
    pub fn new(policy: Policy, latest_version: u32) -> Self {
        Self {
            policy,
            latest_version,
        }
    }

    /// Whether the policy changed since its baseline version
    pub fn has_newer_versions(&self) -> bool {
        self.latest_version > 1
    }
}
