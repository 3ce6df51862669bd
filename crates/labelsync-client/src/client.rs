//! Catalog rules API client implementation.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use labelsync_core::{
    Label, LabelPlatform, LabelSet, LabelWrite, PlatformSettings, Policy, PolicyFilter,
    PolicyKind, PolicySummary, RuleDefinition, RuleVersion, Settings,
};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::models::{PolicyDocument, RuleListResponse, WireLabel};
use crate::payload;
use crate::retry::RetryPolicy;

/// Path of the rules API below the base URL.
const RULES_PATH: &str = "/catalog-server/api/rules";

/// API key pair sent as `accessKey` / `secretKey` headers.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Normalize a configured base URL: default to https, drop trailing slashes.
fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::Config("base URL is empty".to_string()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("https://{trimmed}"))
    }
}

/// Client for the catalog server's rules API.
#[derive(Clone)]
pub struct CatalogClient {
    /// HTTP client.
    client: Client,
    /// Scheme and host, without trailing slash.
    base_url: String,
    credentials: Credentials,
    /// Page size for policy enumeration.
    page_size: u32,
    retry: RetryPolicy,
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("page_size", &self.page_size)
            .field("retry", &self.retry)
            .finish()
    }
}

impl CatalogClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns error if the base URL or page size is invalid, or the HTTP
    /// client cannot be created.
    pub fn new(
        platform: &PlatformSettings,
        credentials: Credentials,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if platform.page_size == 0 {
            return Err(ClientError::Config("page size must be at least 1".to_string()));
        }
        let base_url = normalize_base_url(&platform.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(platform.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            credentials,
            page_size: platform.page_size,
            retry,
        })
    }

    /// Create a client from loaded settings.
    pub fn from_settings(settings: &Settings, credentials: Credentials) -> Result<Self> {
        Self::new(
            &settings.platform,
            credentials,
            RetryPolicy::from(&settings.retry),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rules_url(&self) -> String {
        format!("{}{RULES_PATH}", self.base_url)
    }

    fn detail_url(&self, policy: &Policy) -> Result<String> {
        let segment = match &policy.kind {
            PolicyKind::DataQuality => "data-quality",
            PolicyKind::Reconciliation => "reconciliation",
            PolicyKind::Other(t) => return Err(ClientError::UnsupportedKind(t.clone())),
        };
        Ok(format!("{}/{segment}/{}", self.rules_url(), policy.id))
    }

    /// Start an authenticated request.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("accessKey", &self.credentials.access_key)
            .header("secretKey", &self.credentials.secret_key)
            .header(ACCEPT, "application/json")
    }

    /// Make an authenticated GET request.
    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!(url = %url, "GET request");

        let response = self.request(Method::GET, url).query(query).send().await?;

        self.handle_response(response).await
    }

    /// Make an authenticated PUT request with a JSON body.
    async fn put(&self, url: &str, body: &Value) -> Result<()> {
        debug!(url = %url, "PUT request");

        let response = self.request(Method::PUT, url).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ClientError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Handle API response, parsing JSON or error.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, "Failed to parse response");
                ClientError::Serialization(e)
            })
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    fn list_query(&self, filter: &PolicyFilter, page: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", page.to_string()),
            ("size", self.page_size.to_string()),
            ("withLatestExecution", "true".to_string()),
            ("sortBy", "startedAt:DESC".to_string()),
        ];
        if !filter.rule_status.is_empty() {
            let statuses: Vec<&str> = filter.rule_status.iter().map(String::as_str).collect();
            query.push(("ruleStatus", statuses.join(",")));
        }
        let types: Vec<String> = filter
            .policy_types
            .iter()
            .map(|t| t.kind().platform_type().to_string())
            .collect();
        if !types.is_empty() {
            query.push(("ruleType", types.join(",")));
        }
        if let Some(tag) = filter.tag() {
            query.push(("tag", tag.to_string()));
        }
        if !filter.assembly_ids.is_empty() {
            query.push(("assemblyIds", filter.assembly_ids.join(",")));
        }
        query
    }

    /// Fetch one page of the policy list.
    pub async fn list_page(&self, filter: &PolicyFilter, page: u32) -> Result<RuleListResponse> {
        let url = self.rules_url();
        let query = self.list_query(filter, page);
        self.retry
            .run("list policies", || self.get(&url, &query))
            .await
    }

    /// Fetch a policy document at a version.
    pub async fn fetch_document(
        &self,
        policy: &Policy,
        version: RuleVersion,
    ) -> Result<PolicyDocument> {
        let url = self.detail_url(policy)?;
        let query: Vec<(&str, String)> = version
            .number()
            .map(|n| vec![("version", n.to_string())])
            .unwrap_or_default();

        self.retry
            .run("fetch policy", || self.get(&url, &query))
            .await
            .map_err(|e| match e {
                ClientError::Api { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
                    ClientError::NotFound {
                        policy_id: policy.id.clone(),
                    }
                }
                other => other,
            })
    }

    /// Write a modified document back.
    async fn update_document(&self, policy: &Policy, document: &PolicyDocument) -> Result<()> {
        let url = self.detail_url(policy)?;
        let body = payload::update_payload(&policy.kind, document);
        self.retry
            .run("update policy", || self.put(&url, &body))
            .await
    }
}

#[async_trait]
impl LabelPlatform for CatalogClient {
    async fn list_policies(
        &self,
        filter: &PolicyFilter,
    ) -> labelsync_core::Result<Vec<PolicySummary>> {
        let mut summaries = Vec::new();
        let mut page = 0u32;

        loop {
            let response = self.list_page(filter, page).await?;
            if response.rules.is_empty() {
                break;
            }
            summaries.extend(response.rules.iter().filter_map(|item| item.rule.to_summary()));
            page += 1;

            let fetched = u64::from(page) * u64::from(self.page_size);
            if response.total_count > 0 && fetched >= response.total_count {
                break;
            }
        }

        debug!(policies = summaries.len(), pages = page, "enumerated policies");
        Ok(summaries)
    }

    async fn fetch_rules(
        &self,
        policy: &Policy,
        version: RuleVersion,
    ) -> labelsync_core::Result<Vec<RuleDefinition>> {
        let mut document = self.fetch_document(policy, version).await?;
        Ok(document.rule_definitions(&policy.kind))
    }

    async fn fetch_labels(&self, policy: &Policy) -> labelsync_core::Result<LabelSet> {
        let mut document = self.fetch_document(policy, RuleVersion::Latest).await?;
        Ok(document.label_set(&policy.kind))
    }

    async fn remove_labels(
        &self,
        policy: &Policy,
        keys: &[String],
    ) -> labelsync_core::Result<LabelWrite> {
        let mut document = self.fetch_document(policy, RuleVersion::Latest).await?;
        let wanted: BTreeSet<&str> = keys.iter().map(String::as_str).collect();

        let mut removed = BTreeSet::new();
        for target in document.targets(&policy.kind) {
            target.labels.retain(|label| match label.key() {
                Some(key) if wanted.contains(key) => {
                    removed.insert(key.to_string());
                    false
                }
                _ => true,
            });
        }

        if !removed.is_empty() {
            self.update_document(policy, &document).await?;
            info!(policy_id = %policy.id, removed = removed.len(), "removed labels");
        }

        let (applied, unmatched): (Vec<String>, Vec<String>) =
            keys.iter().cloned().partition(|k| removed.contains(k));
        Ok(LabelWrite { applied, unmatched })
    }

    async fn add_labels(
        &self,
        policy: &Policy,
        labels: &[Label],
    ) -> labelsync_core::Result<LabelWrite> {
        let mut document = self.fetch_document(policy, RuleVersion::Latest).await?;
        let mut write = LabelWrite::default();
        let mut changed = false;

        {
            let mut targets = document.targets(&policy.kind);
            let mut by_key: HashMap<String, usize> = HashMap::with_capacity(targets.len());
            for (position, target) in targets.iter().enumerate() {
                if let Some(key) = target.derived_key() {
                    by_key.entry(key).or_insert(position);
                }
            }

            for label in labels {
                let Some(&position) = by_key.get(&label.key) else {
                    write.unmatched.push(label.key.clone());
                    continue;
                };
                let target = &mut targets[position];
                if !target.labels.iter().any(|l| l.key() == Some(label.key.as_str())) {
                    target.labels.push(WireLabel::new(label));
                    changed = true;
                }
                write.applied.push(label.key.clone());
            }
        }

        if changed {
            self.update_document(policy, &document).await?;
            info!(policy_id = %policy.id, added = write.applied.len(), "added labels");
        }
        Ok(write)
    }
}
