//! Label reconciliation
//!
//! Computes which labels to remove from and add to a policy so the server
//! reflects the target label set. Two modes are supported:
//!
//! - [`ReconcileMode::Idempotent`] only adds labels whose key is missing.
//!   A server label with the right key but a different value is never
//!   corrected; it is reported as [`SyncWarning::RegistryInconsistency`].
//! - [`ReconcileMode::Override`] removes every server label and re-adds the
//!   whole target set. Labels added by hand on the server are lost.
//!
//! Removals must be applied before additions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Label, LabelSet};
use crate::warning::SyncWarning;

/// How existing server labels are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Add missing keys only; never remove or rewrite
    #[default]
    Idempotent,
    /// Remove all server labels, then add the full target set
    Override,
}

impl ReconcileMode {
    pub fn from_override_flag(override_labels: bool) -> Self {
        if override_labels {
            Self::Override
        } else {
            Self::Idempotent
        }
    }
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idempotent => f.write_str("idempotent"),
            Self::Override => f.write_str("override"),
        }
    }
}

/// The label operations for one policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPlan {
    pub mode: ReconcileMode,
    /// Labels to remove, in key order; applied first
    pub to_remove: Vec<Label>,
    /// Labels to add, in key order
    pub to_add: Vec<Label>,
    /// Target keys already present on the server
    pub skipped: Vec<String>,
    /// Keys whose server value disagrees with the target
    pub mismatches: Vec<SyncWarning>,
}

impl LabelPlan {
    /// Whether applying the plan would change nothing on the server
    pub fn is_noop(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Keys of the labels to remove
    pub fn removal_keys(&self) -> Vec<String> {
        self.to_remove.iter().map(|l| l.key.clone()).collect()
    }
}

/// Compute the label operations that bring `server` in line with `target`.
pub fn reconcile(target: &LabelSet, server: &LabelSet, mode: ReconcileMode) -> LabelPlan {
    let mut plan = LabelPlan {
        mode,
        ..LabelPlan::default()
    };

    match mode {
        ReconcileMode::Override => {
            plan.to_remove = server.to_labels();
            plan.to_add = target.to_labels();
        }
        ReconcileMode::Idempotent => {
            for (key, value) in target.iter() {
                match server.get(key) {
                    None => plan.to_add.push(Label::new(key, value)),
                    Some(existing) => {
                        if existing != value {
                            tracing::warn!(
                                key,
                                registry_value = value,
                                server_value = existing,
                                "server label disagrees with registry; leaving it untouched"
                            );
                            plan.mismatches.push(SyncWarning::RegistryInconsistency {
                                key: key.to_string(),
                                registry_value: value.to_string(),
                                server_value: existing.to_string(),
                            });
                        }
                        plan.skipped.push(key.to_string());
                    }
                }
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(pairs: &[(&str, &str)]) -> LabelSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn idempotent_adds_missing_keys_only() {
        let plan = reconcile(
            &set(&[("A", "1"), ("B", "2")]),
            &set(&[("A", "1")]),
            ReconcileMode::Idempotent,
        );

        assert_eq!(plan.to_add, vec![Label::new("B", "2")]);
        assert!(plan.to_remove.is_empty());
        assert_eq!(plan.skipped, vec!["A".to_string()]);
        assert!(plan.mismatches.is_empty());
    }

    #[test]
    fn idempotent_second_run_adds_nothing() {
        let target = set(&[("A", "1"), ("B", "2")]);
        let first = reconcile(&target, &LabelSet::new(), ReconcileMode::Idempotent);

        let server: LabelSet = first.to_add.iter().cloned().collect();
        let second = reconcile(&target, &server, ReconcileMode::Idempotent);

        assert!(second.to_add.is_empty());
        assert!(second.is_noop());
    }

    #[test]
    fn idempotent_never_corrects_values() {
        let plan = reconcile(
            &set(&[("A", "123")]),
            &set(&[("A", "999")]),
            ReconcileMode::Idempotent,
        );

        assert!(plan.to_add.is_empty());
        assert!(plan.to_remove.is_empty());
        assert_eq!(
            plan.mismatches,
            vec![SyncWarning::RegistryInconsistency {
                key: "A".to_string(),
                registry_value: "123".to_string(),
                server_value: "999".to_string(),
            }]
        );
    }

    #[test]
    fn idempotent_keeps_unknown_server_labels() {
        let plan = reconcile(
            &set(&[("A", "1")]),
            &set(&[("A", "1"), ("manual", "x")]),
            ReconcileMode::Idempotent,
        );
        assert!(plan.to_remove.is_empty());
        assert!(plan.is_noop());
    }

    #[test]
    fn override_replaces_everything() {
        let plan = reconcile(
            &set(&[("A", "123")]),
            &set(&[("A", "999"), ("Z", "000")]),
            ReconcileMode::Override,
        );

        assert_eq!(
            plan.to_remove,
            vec![Label::new("A", "999"), Label::new("Z", "000")]
        );
        assert_eq!(plan.to_add, vec![Label::new("A", "123")]);
        assert!(plan.mismatches.is_empty());
        assert_eq!(plan.removal_keys(), vec!["A".to_string(), "Z".to_string()]);
    }

    #[test]
    fn override_on_empty_server_only_adds() {
        let plan = reconcile(&set(&[("A", "1")]), &LabelSet::new(), ReconcileMode::Override);
        assert!(plan.to_remove.is_empty());
        assert_eq!(plan.to_add.len(), 1);
    }

    #[test]
    fn override_flag_maps_to_mode() {
        assert_eq!(ReconcileMode::from_override_flag(true), ReconcileMode::Override);
        assert_eq!(ReconcileMode::from_override_flag(false), ReconcileMode::Idempotent);
    }
}
