//! [`InMemoryPlatform`]: a [`LabelPlatform`] fake backed by in-memory policies.
//!
//! Labels live on the rules of each policy's latest version, as they do on
//! the real platform. Every call is recorded so tests can assert ordering.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use labelsync_core::{
    Error, Label, LabelPlatform, LabelSet, LabelWrite, Policy, PolicyFilter, PolicySummary, Result,
    RuleDefinition, RuleRecord, RuleVersion,
};

/// A call made against the fake, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    ListPolicies,
    FetchRules { policy_id: String, version: RuleVersion },
    FetchLabels { policy_id: String },
    RemoveLabels { policy_id: String, keys: Vec<String> },
    AddLabels { policy_id: String, labels: Vec<Label> },
}

impl PlatformCall {
    pub fn policy_id(&self) -> Option<&str> {
        match self {
            Self::ListPolicies => None,
            Self::FetchRules { policy_id, .. }
            | Self::FetchLabels { policy_id }
            | Self::RemoveLabels { policy_id, .. }
            | Self::AddLabels { policy_id, .. } => Some(policy_id),
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::RemoveLabels { .. } | Self::AddLabels { .. })
    }
}

struct FakePolicy {
    policy: Policy,
    /// Index 0 is version 1
    versions: Vec<Vec<RuleDefinition>>,
}

impl FakePolicy {
    fn latest_mut(&mut self) -> Option<&mut Vec<RuleDefinition>> {
        self.versions.last_mut()
    }
}

#[derive(Default)]
struct State {
    policies: BTreeMap<String, FakePolicy>,
    failing: BTreeSet<String>,
    calls: Vec<PlatformCall>,
}

/// In-memory platform for engine and CLI tests.
///
/// # Example
///
/// ```rust
/// use labelsync_test_utils::InMemoryPlatform;
/// use labelsync_test_utils::fixtures::{dq_policy, measurement};
///
/// let platform = InMemoryPlatform::new().with_policy(
///     dq_policy("42", "customers"),
///     vec![vec![measurement("rid1", "MISSING_VALUES", "COUNTRY")]],
/// );
/// assert!(platform.calls().is_empty());
/// ```
#[derive(Default)]
pub struct InMemoryPlatform {
    state: Mutex<State>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy with its versions; `versions[0]` is version 1.
    pub fn with_policy(self, policy: Policy, versions: Vec<Vec<RuleDefinition>>) -> Self {
        self.add_policy(policy, versions);
        self
    }

    pub fn add_policy(&self, policy: Policy, versions: Vec<Vec<RuleDefinition>>) {
        let mut state = self.state.lock().unwrap();
        state
            .policies
            .insert(policy.id.clone(), FakePolicy { policy, versions });
    }

    /// Publish a new latest version of a policy.
    pub fn push_version(&self, policy_id: &str, rules: Vec<RuleDefinition>) {
        let mut state = self.state.lock().unwrap();
        state
            .policies
            .get_mut(policy_id)
            .unwrap_or_else(|| panic!("unknown policy {policy_id}"))
            .versions
            .push(rules);
    }

    /// Make every fetch for a policy fail as if retries were exhausted.
    pub fn fail_fetches(&self, policy_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(policy_id.to_string());
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls made for one policy.
    pub fn calls_for(&self, policy_id: &str) -> Vec<PlatformCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.policy_id() == Some(policy_id))
            .collect()
    }

    /// Labels currently on the latest version of a policy.
    pub fn labels(&self, policy_id: &str) -> LabelSet {
        let state = self.state.lock().unwrap();
        state
            .policies
            .get(policy_id)
            .and_then(|p| p.versions.last())
            .map(|rules| collect_labels(rules))
            .unwrap_or_default()
    }

    /// Attach a label directly, bypassing the call log.
    pub fn seed_label(&self, policy_id: &str, rule_id: &str, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        let rules = state
            .policies
            .get_mut(policy_id)
            .and_then(FakePolicy::latest_mut)
            .unwrap_or_else(|| panic!("unknown policy {policy_id}"));
        let rule = rules
            .iter_mut()
            .find(|r| r.rule_id == rule_id)
            .unwrap_or_else(|| panic!("unknown rule {rule_id}"));
        rule.labels.push(Label::new(key, value));
    }

    fn record(&self, call: PlatformCall) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let failing = call
            .policy_id()
            .is_some_and(|id| state.failing.contains(id));
        state.calls.push(call);
        if failing {
            return Err(Error::TransientFetch {
                attempts: 4,
                message: "connection reset by peer".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(policy: &Policy) -> Error {
        Error::PolicyNotFound {
            policy_id: policy.id.clone(),
        }
    }
}

fn collect_labels(rules: &[RuleDefinition]) -> LabelSet {
    rules
        .iter()
        .flat_map(|rule| rule.labels.iter().cloned())
        .collect()
}

fn derived_key(rule: &RuleDefinition) -> Option<String> {
    RuleRecord::from_definition(rule.clone())
        .ok()
        .map(|record| record.derived_key)
}

#[async_trait]
impl LabelPlatform for InMemoryPlatform {
    async fn list_policies(&self, _filter: &PolicyFilter) -> Result<Vec<PolicySummary>> {
        self.record(PlatformCall::ListPolicies)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .policies
            .values()
            .map(|p| PolicySummary::new(p.policy.clone(), p.versions.len() as u32))
            .collect())
    }

    async fn fetch_rules(
        &self,
        policy: &Policy,
        version: RuleVersion,
    ) -> Result<Vec<RuleDefinition>> {
        self.record(PlatformCall::FetchRules {
            policy_id: policy.id.clone(),
            version,
        })?;
        let state = self.state.lock().unwrap();
        let fake = state
            .policies
            .get(&policy.id)
            .ok_or_else(|| Self::not_found(policy))?;
        let rules = match version.number() {
            Some(n) => fake.versions.get((n as usize).saturating_sub(1)),
            None => fake.versions.last(),
        };
        rules.cloned().ok_or_else(|| Self::not_found(policy))
    }

    async fn fetch_labels(&self, policy: &Policy) -> Result<LabelSet> {
        self.record(PlatformCall::FetchLabels {
            policy_id: policy.id.clone(),
        })?;
        Ok(self.labels(&policy.id))
    }

    async fn remove_labels(&self, policy: &Policy, keys: &[String]) -> Result<LabelWrite> {
        self.record(PlatformCall::RemoveLabels {
            policy_id: policy.id.clone(),
            keys: keys.to_vec(),
        })?;
        let mut state = self.state.lock().unwrap();
        let rules = state
            .policies
            .get_mut(&policy.id)
            .and_then(FakePolicy::latest_mut)
            .ok_or_else(|| Self::not_found(policy))?;

        let mut removed = BTreeSet::new();
        for rule in rules.iter_mut() {
            rule.labels.retain(|label| {
                let strip = keys.contains(&label.key);
                if strip {
                    removed.insert(label.key.clone());
                }
                !strip
            });
        }

        let (applied, unmatched): (Vec<String>, Vec<String>) =
            keys.iter().cloned().partition(|k| removed.contains(k));
        Ok(LabelWrite { applied, unmatched })
    }

    async fn add_labels(&self, policy: &Policy, labels: &[Label]) -> Result<LabelWrite> {
        self.record(PlatformCall::AddLabels {
            policy_id: policy.id.clone(),
            labels: labels.to_vec(),
        })?;
        let mut state = self.state.lock().unwrap();
        let rules = state
            .policies
            .get_mut(&policy.id)
            .and_then(FakePolicy::latest_mut)
            .ok_or_else(|| Self::not_found(policy))?;

        let mut write = LabelWrite::default();
        for label in labels {
            let target = rules
                .iter_mut()
                .find(|rule| derived_key(rule).as_deref() == Some(label.key.as_str()));
            match target {
                Some(rule) => {
                    if !rule.labels.iter().any(|l| l.key == label.key) {
                        rule.labels.push(label.clone());
                    }
                    write.applied.push(label.key.clone());
                }
                None => write.unmatched.push(label.key.clone()),
            }
        }
        Ok(write)
    }
}
