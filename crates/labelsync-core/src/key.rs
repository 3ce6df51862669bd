//! Stable semantic keys for rules
//!
//! Platform rule ids change between versions (reconciliation mappings are
//! re-identified on every edit), so rules are matched across versions by a
//! key derived from what the rule checks:
//!
//! | kind                 | key                                   |
//! |----------------------|---------------------------------------|
//! | `CUSTOM`             | `CUSTOM-{digest8(expression)}`        |
//! | `SQL_METRIC`         | `SQL_METRIC-{digest8(expression)}`    |
//! | `UDF_PREDICATE`      | `UDF_PREDICATE-{udf_id}`              |
//! | `SIZE_CHECK`         | `SIZE_CHECK`                          |
//! | other measurement    | `{measurement_type}-{column}`         |
//! | untyped measurement  | `{column}`                            |
//! | `EQUALITY` mapping   | `{left}_{right}`                      |
//! | other mapping        | `{recon_type}-{left}_{right}`         |

use labelsync_fs::short_digest;

use crate::model::{
    DEFAULT_RECON_TYPE, Policy, RuleAttributes, RuleDefinition, RuleKind, RuleRecord,
};
use crate::warning::SyncWarning;

/// Hex characters of the expression digest embedded in a key
pub const EXPRESSION_DIGEST_LEN: usize = 8;

/// A rule lacks an attribute its kind needs for key derivation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("{kind} rule is missing `{attribute}`")]
    MissingAttribute {
        kind: String,
        attribute: &'static str,
    },
}

/// Trim an expression and collapse whitespace runs to a single space
pub fn normalize_expression(expression: &str) -> String {
    expression.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn required<'a>(
    kind: &RuleKind,
    value: &'a Option<String>,
    attribute: &'static str,
) -> Result<&'a str, KeyError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| KeyError::MissingAttribute {
            kind: kind.to_string(),
            attribute,
        })
}

/// Derive the stable key of a rule.
///
/// Deterministic: identical inputs always produce the same key.
///
/// # Errors
///
/// Returns [`KeyError::MissingAttribute`] if the kind needs an attribute
/// that is absent or blank.
pub fn derive_key(kind: &RuleKind, attributes: &RuleAttributes) -> Result<String, KeyError> {
    match kind {
        RuleKind::Custom | RuleKind::SqlMetric => {
            let expression = required(kind, &attributes.expression, "expression")?;
            let digest = short_digest(&normalize_expression(expression), EXPRESSION_DIGEST_LEN);
            Ok(format!("{kind}-{digest}"))
        }
        RuleKind::UdfPredicate => {
            let udf_id = required(kind, &attributes.udf_id, "udf_id")?;
            Ok(format!("{kind}-{udf_id}"))
        }
        RuleKind::SizeCheck => Ok(kind.to_string()),
        RuleKind::Measurement(measurement_type) => {
            let column = required(kind, &attributes.column_name, "column_name")?;
            if measurement_type.trim().is_empty() {
                Ok(column.to_string())
            } else {
                Ok(format!("{kind}-{column}"))
            }
        }
        RuleKind::Mapping(recon_type) => {
            let left = required(kind, &attributes.left_column, "left_column")?;
            let right = required(kind, &attributes.right_column, "right_column")?;
            if recon_type == DEFAULT_RECON_TYPE {
                Ok(format!("{left}_{right}"))
            } else {
                Ok(format!("{recon_type}-{left}_{right}"))
            }
        }
    }
}

/// Derive keys for every rule of a policy version.
///
/// Rules whose key cannot be derived are dropped and reported as
/// [`SyncWarning::MalformedRule`]. Order is preserved.
pub fn key_rules(
    policy: &Policy,
    definitions: Vec<RuleDefinition>,
) -> (Vec<RuleRecord>, Vec<SyncWarning>) {
    let mut records = Vec::with_capacity(definitions.len());
    let mut warnings = Vec::new();

    for definition in definitions {
        let rule_id = definition.rule_id.clone();
        match RuleRecord::from_definition(definition) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    policy_id = %policy.id,
                    rule_id = %rule_id,
                    error = %e,
                    "skipping malformed rule"
                );
                warnings.push(SyncWarning::MalformedRule {
                    rule_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    (records, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PolicyKind;
    use proptest::prelude::*;
    use rstest::rstest;

    fn measurement(t: &str) -> RuleKind {
        RuleKind::Measurement(t.to_string())
    }

    #[rstest]
    #[case(RuleKind::UdfPredicate, RuleAttributes::udf("udf-9"), "UDF_PREDICATE-udf-9")]
    #[case(RuleKind::SizeCheck, RuleAttributes::default(), "SIZE_CHECK")]
    #[case(measurement("NULL_CHECK"), RuleAttributes::column("EMAIL"), "NULL_CHECK-EMAIL")]
    #[case(RuleKind::from_measurement_type(""), RuleAttributes::column("COUNTRY"), "COUNTRY")]
    #[case(measurement("  "), RuleAttributes::column("COUNTRY"), "COUNTRY")]
    #[case(
        RuleKind::mapping("EQUALITY"),
        RuleAttributes::mapping("id", "cust_id"),
        "id_cust_id"
    )]
    #[case(
        RuleKind::mapping("COUNT"),
        RuleAttributes::mapping("id", "cust_id"),
        "COUNT-id_cust_id"
    )]
    fn derives_expected_key(
        #[case] kind: RuleKind,
        #[case] attributes: RuleAttributes,
        #[case] expected: &str,
    ) {
        assert_eq!(derive_key(&kind, &attributes).unwrap(), expected);
    }

    #[test]
    fn expression_keys_embed_short_digest() {
        let attributes = RuleAttributes::expression("amount > 0");
        let key = derive_key(&RuleKind::Custom, &attributes).unwrap();
        let expected = format!("CUSTOM-{}", short_digest("amount > 0", 8));
        assert_eq!(key, expected);
        assert_eq!(key.len(), "CUSTOM-".len() + EXPRESSION_DIGEST_LEN);
    }

    #[test]
    fn expression_whitespace_does_not_change_key() {
        let spaced = RuleAttributes::expression("SELECT  1\n FROM t");
        let trimmed = RuleAttributes::expression(" SELECT 1 FROM t ");
        let a = derive_key(&RuleKind::SqlMetric, &spaced).unwrap();
        let b = derive_key(&RuleKind::SqlMetric, &trimmed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn same_expression_different_kind_gives_different_key() {
        let attributes = RuleAttributes::expression("amount > 0");
        assert_ne!(
            derive_key(&RuleKind::Custom, &attributes).unwrap(),
            derive_key(&RuleKind::SqlMetric, &attributes).unwrap()
        );
    }

    #[test]
    fn same_column_different_kind_gives_different_key() {
        let column = RuleAttributes::column("COUNTRY");
        let missing = derive_key(&measurement("MISSING_VALUES"), &column).unwrap();
        let in_list = derive_key(&measurement("VALUES_IN_LIST"), &column).unwrap();
        assert_eq!(missing, "MISSING_VALUES-COUNTRY");
        assert_eq!(in_list, "VALUES_IN_LIST-COUNTRY");
        assert_ne!(missing, in_list);
    }

    #[test]
    fn swapped_mapping_is_a_different_key() {
        let kind = RuleKind::mapping("EQUALITY");
        assert_ne!(
            derive_key(&kind, &RuleAttributes::mapping("a", "b")).unwrap(),
            derive_key(&kind, &RuleAttributes::mapping("b", "a")).unwrap()
        );
    }

    #[rstest]
    #[case(RuleKind::Custom, RuleAttributes::expression("   "), "expression")]
    #[case(RuleKind::UdfPredicate, RuleAttributes::default(), "udf_id")]
    #[case(measurement("NULL_CHECK"), RuleAttributes::default(), "column_name")]
    #[case(
        RuleKind::mapping(""),
        RuleAttributes { left_column: Some("a".into()), ..Default::default() },
        "right_column"
    )]
    fn missing_attribute_is_an_error(
        #[case] kind: RuleKind,
        #[case] attributes: RuleAttributes,
        #[case] attribute: &str,
    ) {
        match derive_key(&kind, &attributes) {
            Err(KeyError::MissingAttribute { attribute: a, .. }) => assert_eq!(a, attribute),
            other => panic!("expected missing {attribute}, got {other:?}"),
        }
    }

    #[test]
    fn key_rules_skips_malformed_and_keeps_order() {
        let policy = Policy::new("p1", "orders", PolicyKind::DataQuality);
        let definitions = vec![
            RuleDefinition::new("r1", measurement("NULL_CHECK"), RuleAttributes::column("A")),
            RuleDefinition::new("r2", RuleKind::UdfPredicate, RuleAttributes::default()),
            RuleDefinition::new("r3", RuleKind::SizeCheck, RuleAttributes::default()),
        ];

        let (records, warnings) = key_rules(&policy, definitions);

        let ids: Vec<_> = records.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids, ["r1", "r3"]);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            SyncWarning::MalformedRule { rule_id, .. } if rule_id == "r2"
        ));
    }

    proptest! {
        #[test]
        fn derive_key_is_deterministic(kind in "[A-Z_]{1,16}", column in "[A-Za-z0-9_]{1,24}") {
            let kind = RuleKind::from_measurement_type(&kind);
            let attributes = RuleAttributes {
                column_name: Some(column.clone()),
                expression: Some(format!("{column} IS NOT NULL")),
                udf_id: Some(column.clone()),
                ..Default::default()
            };
            prop_assert_eq!(derive_key(&kind, &attributes), derive_key(&kind, &attributes));
        }

        #[test]
        fn distinct_expressions_rarely_collide(a in "[a-z ]{1,40}", b in "[a-z ]{1,40}") {
            prop_assume!(normalize_expression(&a) != normalize_expression(&b));
            prop_assume!(!normalize_expression(&a).is_empty());
            prop_assume!(!normalize_expression(&b).is_empty());
            let ka = derive_key(&RuleKind::Custom, &RuleAttributes::expression(a)).unwrap();
            let kb = derive_key(&RuleKind::Custom, &RuleAttributes::expression(b)).unwrap();
            prop_assert_ne!(ka, kb);
        }
    }
}
