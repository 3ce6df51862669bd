//! Target label set construction

use crate::model::{LabelSet, RuleRecord};
use crate::registry::RegistryEntry;

/// Build the labels that should exist on the server for one policy.
///
/// Every registry entry contributes `derived_key -> rule_id`. Newly added
/// rules contribute their own id only when the registry does not already
/// carry their key, so the recorded original identity always wins.
pub fn build_label_set<'a>(
    registry_entries: impl IntoIterator<Item = &'a RegistryEntry>,
    newly_added: &[RuleRecord],
) -> LabelSet {
    let mut target = LabelSet::new();
    for entry in registry_entries {
        target.insert_if_absent(entry.derived_key.as_str(), entry.rule_id.as_str());
    }
    for rule in newly_added {
        target.insert_if_absent(rule.derived_key.as_str(), rule.rule_id.as_str());
    }
    target
}
