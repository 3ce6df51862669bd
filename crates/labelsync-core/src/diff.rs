//! Version diff: which current rules are unknown to the baseline

use std::collections::{BTreeSet, HashMap};

use crate::model::RuleRecord;
use crate::warning::SyncWarning;

/// Result of diffing a current rule set against baseline keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Current rules whose key is absent from the baseline, in current order
    pub additions: Vec<RuleRecord>,
    /// Key collisions found in the current rule set
    pub collisions: Vec<SyncWarning>,
}

/// Drop rules whose derived key repeats an earlier rule's key.
///
/// The first rule in the given order wins; every dropped rule is reported
/// as a [`SyncWarning::KeyCollision`].
pub fn dedupe_rules(rules: Vec<RuleRecord>) -> (Vec<RuleRecord>, Vec<SyncWarning>) {
    let mut seen: HashMap<String, String> = HashMap::with_capacity(rules.len());
    let mut unique = Vec::with_capacity(rules.len());
    let mut collisions = Vec::new();

    for rule in rules {
        if let Some(kept) = seen.get(&rule.derived_key) {
            tracing::warn!(
                key = %rule.derived_key,
                kept_rule_id = %kept,
                dropped_rule_id = %rule.rule_id,
                "derived key collision; keeping first rule"
            );
            collisions.push(SyncWarning::KeyCollision {
                key: rule.derived_key.clone(),
                kept_rule_id: kept.clone(),
                dropped_rule_id: rule.rule_id,
            });
            continue;
        }
        seen.insert(rule.derived_key.clone(), rule.rule_id.clone());
        unique.push(rule);
    }

    (unique, collisions)
}

/// Return the current rules whose derived key is not in `baseline_keys`.
///
/// Baseline keys missing from `current` (rules deleted upstream) are
/// ignored; the registry keeps them.
pub fn diff(baseline_keys: &BTreeSet<String>, current: Vec<RuleRecord>) -> DiffOutcome {
    let (unique, collisions) = dedupe_rules(current);
    let additions = unique
        .into_iter()
        .filter(|rule| !baseline_keys.contains(&rule.derived_key))
        .collect();

    DiffOutcome {
        additions,
        collisions,
    }
}
