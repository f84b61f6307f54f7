//! Search/log engine adapter (Elasticsearch-compatible `_search` API).
//!
//! Serves both report kinds from one type: the infrastructure variant looks
//! hosts up in the log indices, the APM variant aggregates matched services
//! with their average response time. Token matching is a boolean `should`
//! across all tokens with `minimum_should_match: 1`.

use crate::config::SearchConfig;
use crate::error::SourceError;
use crate::model::{
    ApmApplication, Health, LoggedHost, ReportKind, SearchApmPayload, SearchInfraPayload,
    SourcePayload,
};
use crate::source::{SourceAdapter, SourceId};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub struct SearchSource {
    config: SearchConfig,
    kind: ReportKind,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsWrapper,
    #[serde(default)]
    aggregations: Option<Aggregations>,
}

#[derive(Debug, Deserialize)]
struct HitsWrapper {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: HitSource,
}

#[derive(Debug, Default, Deserialize)]
struct HitSource {
    #[serde(default)]
    host: Option<HostFields>,
    #[serde(default)]
    service: Option<ServiceFields>,
    #[serde(default)]
    labels: Option<LabelFields>,
}

#[derive(Debug, Default, Deserialize)]
struct HostFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    // Scalar in most mappings, array in some; normalized below.
    #[serde(default)]
    ip: Option<Value>,
    #[serde(default)]
    os: Option<OsFields>,
}

#[derive(Debug, Default, Deserialize)]
struct OsFields {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceFields {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelFields {
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Aggregations {
    #[serde(default)]
    services: Option<TermsAgg>,
}

#[derive(Debug, Deserialize)]
struct TermsAgg {
    #[serde(default)]
    buckets: Vec<ServiceBucket>,
}

#[derive(Debug, Deserialize)]
struct ServiceBucket {
    key: String,
    #[serde(default)]
    avg_response_time: Option<AvgAgg>,
}

#[derive(Debug, Default, Deserialize)]
struct AvgAgg {
    #[serde(default)]
    value: Option<f64>,
}

fn normalize_ip(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(ip)) => Some(ip),
        Some(Value::Array(ips)) => ips
            .into_iter()
            .find_map(|v| v.as_str().map(str::to_owned)),
        _ => None,
    }
}

impl SearchSource {
    pub fn infra(config: SearchConfig) -> Self {
        Self {
            config,
            kind: ReportKind::Infrastructure,
        }
    }

    pub fn apm(config: SearchConfig) -> Self {
        Self {
            config,
            kind: ReportKind::ApplicationPerformance,
        }
    }

    fn check_config(&self) -> Result<(), SourceError> {
        if self.config.endpoint.is_empty() {
            return Err(SourceError::Configuration(
                "search backend needs an endpoint URL".to_string(),
            ));
        }
        if !self.config.has_basic_auth() && !self.config.has_bearer_token() {
            return Err(SourceError::Configuration(
                "search backend needs either username/password or a bearer token".to_string(),
            ));
        }
        Ok(())
    }

    fn indices(&self) -> &str {
        if !self.config.index_pattern.is_empty() {
            return &self.config.index_pattern;
        }
        match self.kind {
            ReportKind::Infrastructure => "_all",
            ReportKind::ApplicationPerformance => "apm-*",
        }
    }

    fn query_body(&self, tokens: &[String]) -> Value {
        match self.kind {
            ReportKind::Infrastructure => {
                let should: Vec<Value> = tokens
                    .iter()
                    .flat_map(|token| {
                        [
                            json!({ "match": { "host.name": token } }),
                            json!({ "match": { "host.hostname": token } }),
                        ]
                    })
                    .collect();
                json!({
                    "query": {
                        "bool": { "should": should, "minimum_should_match": 1 }
                    },
                    "_source": ["host.name", "host.hostname", "host.ip", "host.os.name"],
                    "size": 100,
                })
            }
            ReportKind::ApplicationPerformance => {
                let should: Vec<Value> = tokens
                    .iter()
                    .map(|token| json!({ "match": { "labels.domain": token } }))
                    .collect();
                json!({
                    "query": {
                        "bool": { "should": should, "minimum_should_match": 1 }
                    },
                    "_source": ["service.name", "labels.domain", "@timestamp"],
                    "size": 100,
                    "aggs": {
                        "services": {
                            "terms": { "field": "service.name.keyword", "size": 10 },
                            "aggs": {
                                "avg_response_time": {
                                    "avg": { "field": "transaction.duration.us" }
                                }
                            }
                        }
                    }
                })
            }
        }
    }

    async fn search(&self, client: &Client, tokens: &[String]) -> Result<SearchResponse, SourceError> {
        let url = format!(
            "{}/{}/_search",
            self.config.endpoint.trim_end_matches('/'),
            self.indices()
        );

        let mut request = client
            .post(&url)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(self.config.timeout_seconds));

        // Bearer token wins over basic credentials when both are set.
        if self.config.has_bearer_token() {
            request = request.header(
                "Authorization",
                format!("Bearer {}", self.config.bearer_token),
            );
        } else {
            let encoded =
                BASE64.encode(format!("{}:{}", self.config.username, self.config.password));
            request = request.header("Authorization", format!("Basic {}", encoded));
        }

        let response = request.json(&self.query_body(tokens)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, "search"));
        }

        response.json().await.map_err(SourceError::from)
    }

    fn map_infra(response: SearchResponse) -> SearchInfraPayload {
        let hosts = response
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| {
                let host = hit.source.host?;
                let hostname = host.name.or(host.hostname)?;
                Some(LoggedHost {
                    hostname,
                    ip: normalize_ip(host.ip),
                    os: host.os.and_then(|os| os.name),
                })
            })
            .collect();
        SearchInfraPayload { hosts }
    }

    /// Map the service aggregation, recovering per service the token that
    /// actually matched it from the hits rather than pinning everything to
    /// the first token.
    fn map_apm(response: SearchResponse) -> SearchApmPayload {
        let mut domain_by_service: HashMap<String, String> = HashMap::new();
        for hit in &response.hits.hits {
            let service = hit.source.service.as_ref().and_then(|s| s.name.clone());
            let domain = hit.source.labels.as_ref().and_then(|l| l.domain.clone());
            if let (Some(service), Some(domain)) = (service, domain) {
                domain_by_service.entry(service).or_insert(domain);
            }
        }

        let applications = response
            .aggregations
            .and_then(|aggs| aggs.services)
            .map(|terms| terms.buckets)
            .unwrap_or_default()
            .into_iter()
            .map(|bucket| {
                let avg_us = bucket
                    .avg_response_time
                    .and_then(|agg| agg.value)
                    .unwrap_or(0.0);
                ApmApplication {
                    domain: domain_by_service.get(&bucket.key).cloned(),
                    name: bucket.key,
                    health: Health::Healthy,
                    avg_response_ms: (avg_us / 1000.0).round() as u64,
                }
            })
            .collect();
        SearchApmPayload { applications }
    }
}

#[async_trait]
impl SourceAdapter for SearchSource {
    fn id(&self) -> SourceId {
        SourceId::Search
    }

    async fn query(
        &self,
        client: &Client,
        tokens: &[String],
    ) -> Result<SourcePayload, SourceError> {
        self.check_config()?;

        let response = self.search(client, tokens).await?;
        debug!(hits = response.hits.hits.len(), kind = ?self.kind, "search query complete");

        Ok(match self.kind {
            ReportKind::Infrastructure => SourcePayload::SearchInfra(Self::map_infra(response)),
            ReportKind::ApplicationPerformance => {
                SourcePayload::SearchApm(Self::map_apm(response))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SearchConfig {
        SearchConfig {
            endpoint: "http://search.local:9200".into(),
            username: "operator".into(),
            password: "secret".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_io() {
        let source = SearchSource::infra(SearchConfig {
            endpoint: "http://search.local:9200".into(),
            ..Default::default()
        });
        let client = Client::new();
        let err = source
            .query(&client, &["web01".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_index_pattern_defaults_per_kind() {
        assert_eq!(SearchSource::infra(config()).indices(), "_all");
        assert_eq!(SearchSource::apm(config()).indices(), "apm-*");

        let mut custom = config();
        custom.index_pattern = "filebeat-*".into();
        assert_eq!(SearchSource::infra(custom).indices(), "filebeat-*");
    }

    #[test]
    fn test_infra_body_matches_every_token_twice() {
        let source = SearchSource::infra(config());
        let body = source.query_body(&["web01".to_string(), "db02".to_string()]);
        let should = body["query"]["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), 4);
        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
    }

    #[test]
    fn test_apm_mapping_recovers_matching_token() {
        let response: SearchResponse = serde_json::from_value(json!({
            "hits": { "hits": [
                { "_source": { "service": { "name": "checkout" },
                               "labels": { "domain": "shop.example.com" } } },
                { "_source": { "service": { "name": "billing" },
                               "labels": { "domain": "pay.example.com" } } },
            ]},
            "aggregations": { "services": { "buckets": [
                { "key": "checkout", "avg_response_time": { "value": 182_000.0 } },
                { "key": "billing", "avg_response_time": { "value": 74_500.0 } },
                { "key": "inventory" },
            ]}}
        }))
        .unwrap();

        let payload = SearchSource::map_apm(response);
        assert_eq!(payload.applications.len(), 3);

        let checkout = &payload.applications[0];
        assert_eq!(checkout.domain.as_deref(), Some("shop.example.com"));
        assert_eq!(checkout.avg_response_ms, 182);

        let billing = &payload.applications[1];
        assert_eq!(billing.domain.as_deref(), Some("pay.example.com"));

        // No hit names this service, so no token can be attributed.
        assert_eq!(payload.applications[2].domain, None);
        assert_eq!(payload.applications[2].avg_response_ms, 0);
    }

    #[test]
    fn test_infra_mapping_tolerates_sparse_sources() {
        let response: SearchResponse = serde_json::from_value(json!({
            "hits": { "hits": [
                { "_source": { "host": { "name": "web01", "ip": "10.0.0.5",
                                         "os": { "name": "Ubuntu" } } } },
                { "_source": { "host": { "hostname": "db02", "ip": ["10.0.0.9"] } } },
                { "_source": {} },
            ]}
        }))
        .unwrap();

        let payload = SearchSource::map_infra(response);
        assert_eq!(payload.hosts.len(), 2);
        assert_eq!(payload.hosts[0].hostname, "web01");
        assert_eq!(payload.hosts[0].ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(payload.hosts[1].hostname, "db02");
        assert_eq!(payload.hosts[1].ip.as_deref(), Some("10.0.0.9"));
        assert_eq!(payload.hosts[1].os, None);
    }
}
