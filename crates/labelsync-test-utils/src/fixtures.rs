//! Policy and rule builders for test scenarios.

use std::path::{Path, PathBuf};

use labelsync_core::{
    Label, Policy, PolicyKind, RuleAttributes, RuleDefinition, RuleKind, RuleRegistry,
};
use tempfile::TempDir;

/// A data-quality ("standard") policy.
pub fn dq_policy(id: &str, name: &str) -> Policy {
    Policy::new(id, name, PolicyKind::DataQuality)
}

/// A reconciliation policy.
pub fn recon_policy(id: &str, name: &str) -> Policy {
    Policy::new(id, name, PolicyKind::Reconciliation)
}

/// A column rule such as `MISSING_VALUES` on `COUNTRY`.
pub fn measurement(rule_id: &str, measurement_type: &str, column: &str) -> RuleDefinition {
    RuleDefinition::new(
        rule_id,
        RuleKind::from_measurement_type(measurement_type),
        RuleAttributes::column(column),
    )
}

/// A `CUSTOM` rule keyed by its SQL expression.
pub fn custom(rule_id: &str, expression: &str) -> RuleDefinition {
    RuleDefinition::new(rule_id, RuleKind::Custom, RuleAttributes::expression(expression))
}

/// A `UDF_PREDICATE` rule.
pub fn udf(rule_id: &str, udf_id: &str) -> RuleDefinition {
    RuleDefinition::new(rule_id, RuleKind::UdfPredicate, RuleAttributes::udf(udf_id))
}

/// A `SIZE_CHECK` rule.
pub fn size_check(rule_id: &str) -> RuleDefinition {
    RuleDefinition::new(rule_id, RuleKind::SizeCheck, RuleAttributes::default())
}

/// An `EQUALITY` reconciliation column mapping.
pub fn mapping(rule_id: &str, left: &str, right: &str) -> RuleDefinition {
    RuleDefinition::new(
        rule_id,
        RuleKind::mapping("EQUALITY"),
        RuleAttributes::mapping(left, right),
    )
}

/// Attach labels to a rule definition.
pub fn labelled(definition: RuleDefinition, labels: &[(&str, &str)]) -> RuleDefinition {
    definition.with_labels(labels.iter().map(|(k, v)| Label::new(*k, *v)).collect())
}

/// A registry file inside a temporary directory.
///
/// The directory is removed when the value is dropped.
pub struct TestRegistry {
    temp_dir: TempDir,
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRegistry {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Path of the registry file (may not exist yet).
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("registry.toml")
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Load the registry, creating an empty one if the file is absent.
    pub fn open(&self) -> RuleRegistry {
        RuleRegistry::load_or_create(self.path()).unwrap()
    }

    /// Whether the registry file has been written.
    pub fn exists(&self) -> bool {
        self.path().exists()
    }
}
