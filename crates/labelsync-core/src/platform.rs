//! The remote platform seen by the sync engine
//!
//! Every network interaction of a sync run goes through [`LabelPlatform`]:
//! these calls are the only points where a policy's work suspends.

use async_trait::async_trait;
use std::fmt;

use crate::Result;
use crate::config::PolicyFilter;
use crate::model::{Label, LabelSet, Policy, PolicySummary, RuleDefinition};

/// Which version of a policy to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVersion {
    /// Version 1, the anchor for original rule identities
    Baseline,
    /// Whatever version is current on the platform
    Latest,
    /// A specific version number, e.g. the latest one seen at enumeration
    Exact(u32),
}

impl RuleVersion {
    pub const BASELINE_NUMBER: u32 = 1;

    /// The explicit version number to request, if any
    pub fn number(&self) -> Option<u32> {
        match self {
            Self::Baseline => Some(Self::BASELINE_NUMBER),
            Self::Latest => None,
            Self::Exact(n) => Some(*n),
        }
    }
}

impl fmt::Display for RuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number() {
            Some(n) => write!(f, "v{n}"),
            None => f.write_str("latest"),
        }
    }
}

/// Result of a label write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelWrite {
    /// Keys that were written (added or removed)
    pub applied: Vec<String>,
    /// Keys with no matching rule in the latest version; nothing was written
    pub unmatched: Vec<String>,
}

/// Access to policies, rules and labels on the remote platform
///
/// Implementations are responsible for retrying transient failures; an
/// error returned from any method fails the current policy.
#[async_trait]
pub trait LabelPlatform: Send + Sync {
    /// Enumerate policies matching the filter, with their latest versions
    async fn list_policies(&self, filter: &PolicyFilter) -> Result<Vec<PolicySummary>>;

    /// Read the rules of one version of a policy
    async fn fetch_rules(&self, policy: &Policy, version: RuleVersion)
    -> Result<Vec<RuleDefinition>>;

    /// Read the labels currently attached to the latest version's rules
    ///
    /// When several rules carry the same key, the first value wins.
    async fn fetch_labels(&self, policy: &Policy) -> Result<LabelSet>;

    /// Remove every label with one of the given keys
    async fn remove_labels(&self, policy: &Policy, keys: &[String]) -> Result<LabelWrite>;

    /// Attach each label to the rule whose derived key equals the label key
    async fn add_labels(&self, policy: &Policy, labels: &[Label]) -> Result<LabelWrite>;
}
