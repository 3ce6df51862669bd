//! Wire models for the catalog rules API
//!
//! Detail documents keep every field the client does not interpret in a
//! flattened `extra` map, so an update payload can carry them back.

use labelsync_core::{
    DEFAULT_RECON_TYPE, Label, LabelSet, Policy, PolicyKind, PolicySummary, RuleAttributes,
    RuleDefinition, RuleKind, derive_key,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Render a platform identifier (number or string) as a string
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One page of `GET /rules`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleListResponse {
    #[serde(default)]
    pub rules: Vec<RuleListItem>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleListItem {
    #[serde(default)]
    pub rule: RuleHeader,
}

/// Policy header as listed by enumeration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleHeader {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub version: Option<u32>,
}

impl RuleHeader {
    /// Convert to a summary; headers without an id are dropped
    pub fn to_summary(&self) -> Option<PolicySummary> {
        let id = id_string(&self.id)?;
        let policy = Policy::new(id, &self.name, PolicyKind::from_platform_type(&self.rule_type));
        Some(PolicySummary::new(policy, self.version.unwrap_or(1)))
    }
}

/// A label as it appears on items and mappings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireLabel {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl WireLabel {
    pub fn new(label: &Label) -> Self {
        Self {
            key: Some(label.key.clone()),
            value: Value::String(label.value.clone()),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn to_label(&self) -> Option<Label> {
        let value = match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        self.key().map(|key| Label::new(key, value))
    }
}

/// A data-quality rule item from `details.items[]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DqItem {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub measurement_type: String,
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default)]
    pub rule_expression: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DqItem {
    pub fn kind(&self) -> RuleKind {
        RuleKind::from_measurement_type(&self.measurement_type)
    }

    pub fn attributes(&self) -> RuleAttributes {
        RuleAttributes {
            column_name: self.column_name.clone(),
            expression: self.rule_expression.clone(),
            udf_id: self.value.get("udfId").and_then(id_string),
            ..RuleAttributes::default()
        }
    }
}

/// A reconciliation column mapping from `details.columnMappings[]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub left_column_name: String,
    #[serde(default)]
    pub right_column_name: String,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ColumnMapping {
    pub fn attributes(&self) -> RuleAttributes {
        RuleAttributes::mapping(&self.left_column_name, &self.right_column_name)
    }
}

/// `details` of a policy document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDetails {
    #[serde(default)]
    pub items: Vec<DqItem>,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
    #[serde(default, rename = "transformUDFs")]
    pub transform_udfs: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A policy document from `GET /rules/{kind}/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub rule: Map<String, Value>,
    #[serde(default)]
    pub details: PolicyDetails,
}

/// A labelled element of a document: an item or a column mapping
pub struct LabelTarget<'a> {
    pub rule_id: Option<String>,
    pub kind: RuleKind,
    pub attributes: RuleAttributes,
    pub labels: &'a mut Vec<WireLabel>,
}

impl LabelTarget<'_> {
    pub fn derived_key(&self) -> Option<String> {
        derive_key(&self.kind, &self.attributes).ok()
    }
}

impl PolicyDocument {
    /// Reconciliation type from `details.items[0].measurementType`
    pub fn recon_type(&self) -> &str {
        self.details
            .items
            .first()
            .map(|item| item.measurement_type.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_RECON_TYPE)
    }

    /// The labelled elements for a policy kind
    pub fn targets(&mut self, kind: &PolicyKind) -> Vec<LabelTarget<'_>> {
        match kind {
            PolicyKind::Reconciliation => {
                let mapping_kind = RuleKind::mapping(self.recon_type());
                self.details
                    .column_mappings
                    .iter_mut()
                    .map(|mapping| LabelTarget {
                        rule_id: id_string(&mapping.id),
                        kind: mapping_kind.clone(),
                        attributes: mapping.attributes(),
                        labels: &mut mapping.labels,
                    })
                    .collect()
            }
            _ => self
                .details
                .items
                .iter_mut()
                .map(|item| LabelTarget {
                    rule_id: id_string(&item.id),
                    kind: item.kind(),
                    attributes: item.attributes(),
                    labels: &mut item.labels,
                })
                .collect(),
        }
    }

    /// Rules of the document; elements without an id are dropped
    pub fn rule_definitions(&mut self, kind: &PolicyKind) -> Vec<RuleDefinition> {
        self.targets(kind)
            .into_iter()
            .filter_map(|target| {
                let Some(rule_id) = target.rule_id else {
                    tracing::warn!(kind = %target.kind, "rule without id ignored");
                    return None;
                };
                let labels = target.labels.iter().filter_map(WireLabel::to_label).collect();
                Some(
                    RuleDefinition::new(rule_id, target.kind, target.attributes)
                        .with_labels(labels),
                )
            })
            .collect()
    }

    /// Labels on every element; when keys repeat the first value wins
    ///
    /// The set is policy-level: a label counts as present whichever element
    /// carries it, even one whose derived key is different.
    pub fn label_set(&mut self, kind: &PolicyKind) -> LabelSet {
        self.targets(kind)
            .iter()
            .flat_map(|target| target.labels.iter().filter_map(WireLabel::to_label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dq_document() -> PolicyDocument {
        serde_json::from_value(json!({
            "rule": {"id": 42, "name": "customers", "type": "DATA_QUALITY"},
            "details": {
                "items": [
                    {"id": 1, "measurementType": "MISSING_VALUES", "columnName": "COUNTRY",
                     "labels": [{"key": "MISSING_VALUES-COUNTRY", "value": "1"}], "weightage": 10},
                    {"id": 2, "measurementType": "UDF_PREDICATE", "value": {"udfId": 77}},
                    {"measurementType": "SIZE_CHECK"}
                ],
                "transformUDFs": [{"id": 5}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn unknown_item_fields_are_kept() {
        let document = dq_document();
        assert_eq!(document.details.items[0].extra["weightage"], json!(10));
        assert_eq!(document.details.transform_udfs.len(), 1);
    }

    #[test]
    fn dq_items_become_rule_definitions() {
        let mut document = dq_document();
        let rules = document.rule_definitions(&PolicyKind::DataQuality);

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule_id, "1");
        assert_eq!(rules[0].labels, vec![Label::new("MISSING_VALUES-COUNTRY", "1")]);
        assert_eq!(rules[1].kind, RuleKind::UdfPredicate);
        assert_eq!(rules[1].attributes.udf_id.as_deref(), Some("77"));
    }

    #[test]
    fn recon_type_defaults_to_equality() {
        let mut document: PolicyDocument = serde_json::from_value(json!({
            "rule": {"id": 7},
            "details": {
                "columnMappings": [
                    {"id": 11, "leftColumnName": "id", "rightColumnName": "cust_id"}
                ]
            }
        }))
        .unwrap();

        assert_eq!(document.recon_type(), "EQUALITY");
        let targets = document.targets(&PolicyKind::Reconciliation);
        assert_eq!(targets[0].derived_key().as_deref(), Some("id_cust_id"));
    }

    #[test]
    fn label_set_spans_all_elements() {
        let mut document: PolicyDocument = serde_json::from_value(json!({
            "rule": {"id": 42, "type": "DATA_QUALITY"},
            "details": {
                "items": [
                    {"id": 1, "measurementType": "MISSING_VALUES", "columnName": "COUNTRY",
                     "labels": [{"key": "SIZE_CHECK", "value": "9"}]},
                    {"id": 2, "measurementType": "SIZE_CHECK",
                     "labels": [{"key": "SIZE_CHECK", "value": "2"}]}
                ]
            }
        }))
        .unwrap();

        let labels = document.label_set(&PolicyKind::DataQuality);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("SIZE_CHECK"), Some("9"));
    }

    #[test]
    fn header_without_id_is_dropped() {
        let header: RuleHeader = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(header.to_summary().is_none());

        let header: RuleHeader =
            serde_json::from_value(json!({"id": 9, "name": "x", "type": "EQUALITY", "version": 3}))
                .unwrap();
        let summary = header.to_summary().unwrap();
        assert_eq!(summary.policy.id, "9");
        assert_eq!(summary.policy.kind, PolicyKind::Reconciliation);
        assert_eq!(summary.latest_version, 3);
    }
}
