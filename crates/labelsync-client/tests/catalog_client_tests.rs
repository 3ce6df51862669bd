//! Tests for CatalogClient against a mock catalog server

use std::time::Duration;

use labelsync_client::{CatalogClient, Credentials, RetryPolicy};
use labelsync_core::{
    Error, Label, LabelPlatform, PlatformSettings, Policy, PolicyFilter, PolicyKind, RuleKind,
    RuleVersion,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DQ_PATH: &str = "/catalog-server/api/rules/data-quality/42";
const RECON_PATH: &str = "/catalog-server/api/rules/reconciliation/7";

fn client(server: &MockServer, max_attempts: u32) -> CatalogClient {
    let settings = PlatformSettings {
        base_url: server.uri(),
        timeout_secs: 5,
        page_size: 2,
    };
    let retry = RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    };
    CatalogClient::new(&settings, Credentials::new("ak", "sk"), retry).unwrap()
}

fn dq_policy() -> Policy {
    Policy::new("42", "customers", PolicyKind::DataQuality)
}

fn recon_policy() -> Policy {
    Policy::new("7", "ledger", PolicyKind::Reconciliation)
}

fn dq_document() -> Value {
    json!({
        "rule": {"id": 42, "name": "customers", "type": "DATA_QUALITY"},
        "details": {
            "items": [
                {"id": 5, "measurementType": "MISSING_VALUES", "columnName": "COUNTRY",
                 "labels": [{"key": "MISSING_VALUES-COUNTRY", "value": "1"}]},
                {"id": 7, "measurementType": "VALUES_IN_LIST", "columnName": "COUNTRY",
                 "labels": []}
            ]
        }
    })
}

fn recon_document() -> Value {
    json!({
        "rule": {"id": 7, "name": "ledger", "type": "EQUALITY"},
        "details": {
            "items": [{"id": 3, "measurementType": "EQUALITY"}],
            "columnMappings": [
                {"id": 11, "leftColumnName": "id", "rightColumnName": "cust_id",
                 "labels": [{"key": "id_cust_id", "value": "9"}, {"key": "MANUAL", "value": "x"}]}
            ]
        }
    })
}

async fn put_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

mod enumeration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_policies_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/catalog-server/api/rules"))
            .and(query_param("page", "0"))
            .and(query_param("size", "2"))
            .and(query_param("ruleType", "DATA_QUALITY,EQUALITY"))
            .and(header("accessKey", "ak"))
            .and(header("secretKey", "sk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rules": [
                    {"rule": {"id": 42, "name": "customers", "type": "DATA_QUALITY", "version": 3}},
                    {"rule": {"id": 7, "name": "ledger", "type": "EQUALITY", "version": 1}}
                ],
                "totalCount": 3
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/catalog-server/api/rules"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rules": [{"rule": {"id": "99", "name": "fresh", "type": "FRESHNESS"}}],
                "totalCount": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summaries = client(&server, 1)
            .list_policies(&PolicyFilter::default())
            .await
            .unwrap();

        let ids: Vec<_> = summaries.iter().map(|s| s.policy.id.as_str()).collect();
        assert_eq!(ids, vec!["42", "7", "99"]);
        assert_eq!(summaries[0].latest_version, 3);
        assert_eq!(summaries[1].policy.kind, PolicyKind::Reconciliation);
        assert_eq!(summaries[2].latest_version, 1);
    }

    #[tokio::test]
    async fn test_list_policies_stops_on_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/catalog-server/api/rules"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rules": []})))
            .expect(1)
            .mount(&server)
            .await;

        let summaries = client(&server, 1)
            .list_policies(&PolicyFilter::default())
            .await
            .unwrap();
        assert!(summaries.is_empty());
    }
}

mod fetch_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_fetch_baseline_requests_version_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .and(query_param("version", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dq_document()))
            .expect(1)
            .mount(&server)
            .await;

        let rules = client(&server, 1)
            .fetch_rules(&dq_policy(), RuleVersion::Baseline)
            .await
            .unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule_id, "5");
        assert_eq!(rules[1].kind, RuleKind::Measurement("VALUES_IN_LIST".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_exact_version_sends_number() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .and(query_param("version", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dq_document()))
            .expect(1)
            .mount(&server)
            .await;

        let rules = client(&server, 1)
            .fetch_rules(&dq_policy(), RuleVersion::Exact(3))
            .await
            .unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_labels_reads_mapping_labels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECON_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(recon_document()))
            .mount(&server)
            .await;

        let labels = client(&server, 1).fetch_labels(&recon_policy()).await.unwrap();

        assert_eq!(labels.get("id_cust_id"), Some("9"));
        assert_eq!(labels.get("MANUAL"), Some("x"));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(dq_document()))
            .mount(&server)
            .await;

        let rules = client(&server, 4)
            .fetch_rules(&dq_policy(), RuleVersion::Latest)
            .await
            .unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_transient_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 3)
            .fetch_rules(&dq_policy(), RuleVersion::Latest)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TransientFetch { attempts: 3, .. }), "got {err}");
    }

    #[tokio::test]
    async fn test_missing_policy_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 4)
            .fetch_rules(&dq_policy(), RuleVersion::Latest)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PolicyNotFound { ref policy_id } if policy_id == "42"));
    }
}

mod write_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_add_labels_puts_label_on_matching_item() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(dq_document()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(DQ_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let write = client(&server, 1)
            .add_labels(
                &dq_policy(),
                &[
                    Label::new("VALUES_IN_LIST-COUNTRY", "7"),
                    Label::new("SIZE_CHECK", "3"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(write.applied, vec!["VALUES_IN_LIST-COUNTRY".to_string()]);
        assert_eq!(write.unmatched, vec!["SIZE_CHECK".to_string()]);

        let bodies = put_bodies(&server).await;
        assert_eq!(bodies.len(), 1);
        assert_eq!(
            bodies[0]["items"][1]["labels"],
            json!([{"key": "VALUES_IN_LIST-COUNTRY", "value": "7"}])
        );
        assert_eq!(
            bodies[0]["items"][0]["labels"],
            json!([{"key": "MISSING_VALUES-COUNTRY", "value": "1"}])
        );
    }

    #[tokio::test]
    async fn test_add_existing_label_skips_put() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(dq_document()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let write = client(&server, 1)
            .add_labels(&dq_policy(), &[Label::new("MISSING_VALUES-COUNTRY", "1")])
            .await
            .unwrap();

        assert_eq!(write.applied, vec!["MISSING_VALUES-COUNTRY".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_labels_from_recon_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RECON_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(recon_document()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(RECON_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let write = client(&server, 1)
            .remove_labels(
                &recon_policy(),
                &["MANUAL".to_string(), "GONE".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(write.applied, vec!["MANUAL".to_string()]);
        assert_eq!(write.unmatched, vec!["GONE".to_string()]);

        let bodies = put_bodies(&server).await;
        let mapping = &bodies[0]["mappings"][0];
        assert_eq!(mapping["labels"], json!([{"key": "id_cust_id", "value": "9"}]));
        assert_eq!(mapping["operation"], "EQ");
        assert_eq!(bodies[0]["cloningDetails"], Value::Null);
    }

    #[tokio::test]
    async fn test_rejected_update_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DQ_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(dq_document()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 4)
            .add_labels(&dq_policy(), &[Label::new("VALUES_IN_LIST-COUNTRY", "7")])
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::Platform { status: Some(400), .. }),
            "got {err}"
        );
    }
}
