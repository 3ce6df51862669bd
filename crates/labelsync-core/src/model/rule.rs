//! Rule kinds, attributes and keyed rule records

use serde::{Deserialize, Serialize};
use std::fmt;

use super::label::Label;
use crate::key::{KeyError, derive_key};

/// Reconciliation type whose mapping keys carry no kind prefix
pub const DEFAULT_RECON_TYPE: &str = "EQUALITY";

/// Discriminator governing how a rule's key is derived
///
/// Data-quality rules are classified by their `measurementType`; anything
/// not listed explicitly falls into [`RuleKind::Measurement`], the
/// column-based fallback. Reconciliation mappings are always
/// [`RuleKind::Mapping`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Custom SQL expression check
    Custom,
    /// SQL metric check
    SqlMetric,
    /// Predicate backed by a user-defined function
    UdfPredicate,
    /// Whole-table size check; at most one per policy
    SizeCheck,
    /// Column-based measurement, carrying the platform measurement type
    Measurement(String),
    /// Reconciliation column mapping, carrying the reconciliation type
    Mapping(String),
}

impl RuleKind {
    /// Classify a data-quality item by its `measurementType`
    pub fn from_measurement_type(value: &str) -> Self {
        match value {
            "CUSTOM" => Self::Custom,
            "SQL_METRIC" => Self::SqlMetric,
            "UDF_PREDICATE" => Self::UdfPredicate,
            "SIZE_CHECK" => Self::SizeCheck,
            other => Self::Measurement(other.to_string()),
        }
    }

    /// A reconciliation mapping kind; an empty type means `EQUALITY`
    pub fn mapping(recon_type: &str) -> Self {
        if recon_type.trim().is_empty() {
            Self::Mapping(DEFAULT_RECON_TYPE.to_string())
        } else {
            Self::Mapping(recon_type.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Custom => "CUSTOM",
            Self::SqlMetric => "SQL_METRIC",
            Self::UdfPredicate => "UDF_PREDICATE",
            Self::SizeCheck => "SIZE_CHECK",
            Self::Measurement(t) | Self::Mapping(t) => t,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific descriptive fields of a rule
///
/// Which fields are required depends on the [`RuleKind`]; see
/// [`derive_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udf_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_column: Option<String>,
}

impl RuleAttributes {
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            column_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn expression(text: impl Into<String>) -> Self {
        Self {
            expression: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn udf(udf_id: impl Into<String>) -> Self {
        Self {
            udf_id: Some(udf_id.into()),
            ..Self::default()
        }
    }

    pub fn mapping(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left_column: Some(left.into()),
            right_column: Some(right.into()),
            ..Self::default()
        }
    }
}

/// A rule as read from the platform, before its key is derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    pub rule_id: String,
    pub kind: RuleKind,
    pub attributes: RuleAttributes,
    /// Labels currently attached to the rule on the server
    pub labels: Vec<Label>,
}

impl RuleDefinition {
    pub fn new(rule_id: impl Into<String>, kind: RuleKind, attributes: RuleAttributes) -> Self {
        Self {
            rule_id: rule_id.into(),
            kind,
            attributes,
            labels: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.labels = labels;
        self
    }
}

/// A rule with its derived key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    pub rule_id: String,
    pub derived_key: String,
    pub kind: RuleKind,
    pub attributes: RuleAttributes,
    pub labels: Vec<Label>,
}

impl RuleRecord {
    /// Derive the key of a platform rule.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when an attribute the kind needs is missing.
    pub fn from_definition(definition: RuleDefinition) -> Result<Self, KeyError> {
        let derived_key = derive_key(&definition.kind, &definition.attributes)?;
        Ok(Self {
            rule_id: definition.rule_id,
            derived_key,
            kind: definition.kind,
            attributes: definition.attributes,
            labels: definition.labels,
        })
    }
}
