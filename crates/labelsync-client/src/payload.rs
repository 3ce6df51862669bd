//! Update payloads for `PUT /rules/{kind}/{id}`
//!
//! The update endpoint accepts a narrower shape than the detail endpoint
//! returns. Payloads copy the accepted fields from the fetched document and
//! fill the platform's defaults for fields it omits.

use labelsync_core::PolicyKind;
use serde_json::{Map, Value, json};

use crate::models::{ColumnMapping, DqItem, PolicyDocument, WireLabel};

fn get(map: &Map<String, Value>, key: &str, default: Value) -> Value {
    map.get(key).cloned().unwrap_or(default)
}

fn get_or_null(map: &Map<String, Value>, key: &str) -> Value {
    get(map, key, Value::Null)
}

/// An object-valued field, treating null as empty
fn object<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    map.get(key).and_then(Value::as_object)
}

fn labels(labels: &[WireLabel]) -> Value {
    labels
        .iter()
        .map(|l| json!({"key": l.key, "value": l.value}))
        .collect()
}

fn notification_channels(rule: &Map<String, Value>, enabled_default: Value) -> Value {
    let empty = Map::new();
    let channels = object(rule, "notificationChannels").unwrap_or(&empty);
    json!({
        "configuredNotificationGroupIds":
            get(channels, "configuredNotificationGroupIds", json!([])),
        "notifyOn": get(channels, "notifyOn", json!([])),
        "notifyOnSuccess": get(channels, "notifyOnSuccess", json!(false)),
        "severity": get(channels, "severity", json!("CRITICAL")),
        "alertsEnabled": get(channels, "alertsEnabled", json!(true)),
        "reNotifyFactor": get(channels, "reNotifyFactor", json!(0)),
        "notifyOnWarning": get(channels, "notifyOnWarning", json!(false)),
        "notificationEnabled": get(channels, "notificationEnabled", enabled_default),
    })
}

/// Build the update payload for a policy document
pub fn update_payload(kind: &PolicyKind, document: &PolicyDocument) -> Value {
    match kind {
        PolicyKind::Reconciliation => reconciliation_payload(document),
        _ => data_quality_payload(document),
    }
}

fn dq_item(item: &DqItem) -> Value {
    let extra = &item.extra;
    let mut body = json!({
        "measurementType": item.measurement_type,
        "columnName": item.column_name.clone().unwrap_or_default(),
        "executionOrder": get_or_null(extra, "executionOrder"),
        "weightage": get_or_null(extra, "weightage"),
        "businessExplanation": get(extra, "businessExplanation", json!("")),
        "labels": labels(&item.labels),
        "isWarning": get(extra, "isWarning", json!(false)),
        "associatedDQRecommendationId": get_or_null(extra, "associatedDQRecommendationId"),
        "bulkPolicyDqRuleId": get_or_null(extra, "bulkPolicyDqRuleId"),
        "thresholdConfig": get_or_null(extra, "thresholdConfig"),
        "value": item.value,
        "id": item.id,
    });
    if let Some(expression) = item.rule_expression.as_deref().filter(|e| !e.is_empty()) {
        body["ruleExpression"] = json!(expression);
    }
    body
}

/// Payload for a data-quality policy
pub fn data_quality_payload(document: &PolicyDocument) -> Value {
    let rule = &document.rule;
    let empty = Map::new();
    let backing_asset = object(rule, "backingAsset").unwrap_or(&empty);

    json!({
        "rule": {
            "subType": get(rule, "subType", json!("ASSET")),
            "enabled": get(rule, "enabled", json!(true)),
            "name": get_or_null(rule, "name"),
            "description": get_or_null(rule, "description"),
            "schedule": get(rule, "schedule", json!("")),
            "executionTimeoutInMinutes": get_or_null(rule, "executionTimeoutInMinutes"),
            "totalExecutionTimeoutInMinutes": get_or_null(rule, "totalExecutionTimeoutInMinutes"),
            "analyticsPipelineId": null,
            "scheduleType": "RECENT",
            "jobSchedule": get_or_null(rule, "jobSchedule"),
            "segments": get(rule, "segments", json!([])),
            "customSqlConfig": get_or_null(rule, "customSqlConfig"),
            "policyScoreStrategy": get(rule, "policyScoreStrategy", json!("WEIGHTAGE")),
            "thresholdLevel":
                get(rule, "thresholdLevel", json!({"success": 100, "warning": 70})),
            "id": get_or_null(rule, "id"),
            "includeInQualityScore": get(rule, "includeInQualityScore", json!(true)),
            "type": get(rule, "type", json!("DATA_QUALITY")),
            "scheduled": get(rule, "scheduled", json!(false)),
            "backingAsset": {
                "tableAssetId": get_or_null(backing_asset, "tableAssetId"),
                "id": get_or_null(backing_asset, "id"),
            },
            "notificationChannels": notification_channels(rule, json!(true)),
            "sparkResourceConfig": get_or_null(rule, "sparkResourceConfig"),
            "policyGroups": get(rule, "policyGroups", json!([])),
            "labels": get(rule, "labels", json!([])),
            "tags": get(rule, "tags", json!([])),
            "additionalPersistedColumns": get(rule, "additionalPersistedColumns", json!([])),
            "filter": get_or_null(rule, "filter"),
            "sparkSQLFilterType": get(rule, "sparkSQLFilterType", json!("STATIC")),
        },
        "items": document.details.items.iter().map(dq_item).collect::<Vec<_>>(),
        "transformUDFs": document.details.transform_udfs,
        "engineType": get(rule, "engineType", json!("JDBC_SQL")),
    })
}

fn column_mapping(mapping: &ColumnMapping) -> Value {
    let extra = &mapping.extra;
    json!({
        "id": mapping.id,
        "leftColumnName": mapping.left_column_name,
        "operation": get(extra, "operation", json!("EQ")),
        "rightColumnName": mapping.right_column_name,
        "useForJoining": get(extra, "useForJoining", json!(false)),
        "reconciliationRuleId": get_or_null(extra, "reconciliationRuleId"),
        "isJoinColumnUsedForMeasure": get(extra, "isJoinColumnUsedForMeasure", json!(false)),
        "ignoreNullValues": get(extra, "ignoreNullValues", json!(false)),
        "weightage": get(extra, "weightage", json!(100)),
        "ruleVersion": get_or_null(extra, "ruleVersion"),
        "businessExplanation": get(extra, "businessExplanation", json!("")),
        "isWarning": get(extra, "isWarning", json!(false)),
        "labels": labels(&mapping.labels),
        "isArchived": get(extra, "isArchived", json!(false)),
        "mappingType": get(extra, "mappingType", json!("AUTO")),
    })
}

/// Payload for a reconciliation policy
pub fn reconciliation_payload(document: &PolicyDocument) -> Value {
    let rule = &document.rule;
    let empty = Map::new();
    let left_asset = object(rule, "leftBackingAsset").unwrap_or(&empty);
    let right_asset = object(rule, "rightBackingAsset").unwrap_or(&empty);
    let spark = object(rule, "sparkResourceConfig").unwrap_or(&empty);
    let name = get_or_null(rule, "name");

    let items: Vec<Value> = document
        .details
        .items
        .iter()
        .map(|item| {
            let measurement_type = if item.measurement_type.is_empty() {
                labelsync_core::DEFAULT_RECON_TYPE
            } else {
                item.measurement_type.as_str()
            };
            json!({
                "measurementType": measurement_type,
                "executionOrder": get(&item.extra, "executionOrder", json!(1)),
                "id": item.id,
            })
        })
        .collect();

    json!({
        "rule": {
            "subType": get(rule, "subType", json!("ASSET")),
            "enabled": get(rule, "enabled", json!(true)),
            "name": name,
            "description": get_or_null(rule, "description"),
            "executionTimeoutInMinutes": get_or_null(rule, "executionTimeoutInMinutes"),
            "totalExecutionTimeoutInMinutes": get_or_null(rule, "totalExecutionTimeoutInMinutes"),
            "analyticsPipelineId": get_or_null(rule, "analyticsPipelineId"),
            "scheduleType": get(rule, "scheduleType", json!("FULL")),
            "jobSchedule": get_or_null(rule, "jobSchedule"),
            "segments": get(rule, "segments", json!([])),
            "customSqlConfig": get_or_null(rule, "customSqlConfig"),
            "policyScoreStrategy": get(rule, "policyScoreStrategy", json!("WEIGHTAGE")),
            "thresholdLevel":
                get(rule, "thresholdLevel", json!({"success": 100, "warning": 70})),
            "leftFilter": get(rule, "leftFilter", json!("")),
            "leftSparkFilterSelectedColumns":
                get(rule, "leftSparkFilterSelectedColumns", json!([])),
            "leftSparkSQLFilterType": get(rule, "leftSparkSQLFilterType", json!("STATIC")),
            "rightFilter": get(rule, "rightFilter", json!("")),
            "rightSparkFilterSelectedColumns":
                get(rule, "rightSparkFilterSelectedColumns", json!([])),
            "rightSparkSQLFilterType": get(rule, "rightSparkSQLFilterType", json!("STATIC")),
            "delayInMinutes": get_or_null(rule, "delayInMinutes"),
            "engineType": get(rule, "engineType", json!("SPARK")),
            "leftEngineType": get(rule, "leftEngineType", json!("SPARK")),
            "rightEngineType": get(rule, "rightEngineType", json!("SPARK")),
            "joinType": get(rule, "joinType", json!("LEFT")),
            "leftSparkSQLDynamicFilterVariableMapping": get(
                rule,
                "leftSparkSQLDynamicFilterVariableMapping",
                json!({"ruleName": name, "mapping": []}),
            ),
            "rightSparkSQLDynamicFilterVariableMapping": get(
                rule,
                "rightSparkSQLDynamicFilterVariableMapping",
                json!({"ruleName": name, "mapping": []}),
            ),
            "id": get_or_null(rule, "id"),
            "includeInQualityScore": get(rule, "includeInQualityScore", json!(true)),
            "type": get(rule, "type", json!("EQUALITY")),
            "scheduled": get(rule, "scheduled", json!(false)),
            "leftBackingAsset": {
                "tableAssetId": get_or_null(left_asset, "tableAssetId"),
                "id": get_or_null(left_asset, "id"),
            },
            "rightBackingAsset": {
                "tableAssetId": get_or_null(right_asset, "tableAssetId"),
                "marker": get_or_null(right_asset, "marker"),
                "id": get_or_null(right_asset, "id"),
            },
            "timeSecondsOffset": get(rule, "timeSecondsOffset", json!(30)),
            "notificationChannels": notification_channels(rule, json!(false)),
            "sparkResourceConfig": {
                "additionalConfiguration": get(spark, "additionalConfiguration", json!({})),
                "yunikorn": get_or_null(spark, "yunikorn"),
            },
            "resourceStrategyType": get(rule, "resourceStrategyType", json!("INVENTORY")),
            "selectedResourceInventory": get(rule, "selectedResourceInventory", json!("Medium")),
            "autoRetryEnabled": get(rule, "autoRetryEnabled", json!(false)),
            "policyGroups": get(rule, "policyGroups", json!([])),
            "labels": get(rule, "labels", json!([])),
            "tags": get(rule, "tags", json!([])),
        },
        "items": items,
        "mappings": document.details.column_mappings.iter().map(column_mapping).collect::<Vec<_>>(),
        "cloningDetails": null,
        "analyticsPipelineId": get_or_null(rule, "analyticsPipelineId"),
    })
}
