//! Mock backends for integration tests, one builder per scenario.

use monitoring_aggregator::{AlertingConfig, MonitorConfig, SearchConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn alerting_config(uri: &str) -> AlertingConfig {
    AlertingConfig {
        endpoint: uri.to_string(),
        api_token: "alerting-token".to_string(),
        timeout_seconds: 2,
    }
}

pub fn search_config(uri: &str) -> SearchConfig {
    SearchConfig {
        endpoint: uri.to_string(),
        username: "operator".to_string(),
        password: "secret".to_string(),
        ..Default::default()
    }
}

pub fn monitor_config(uri: &str) -> MonitorConfig {
    MonitorConfig {
        endpoint: uri.to_string(),
        api_token: "monitor-token".to_string(),
        ..Default::default()
    }
}

/// Alerting backend answering `host.get`, `trigger.get` and
/// `apiinfo.version` by dispatching on the RPC method in the request body.
pub async fn setup_alerting_mock(latency_ms: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api_jsonrpc.php"))
        .respond_with(move |req: &wiremock::Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap_or_default();
            let rpc_method = body["method"].as_str().unwrap_or_default();

            let result = match rpc_method {
                "host.get" => json!([{
                    "hostid": "10084",
                    "host": "web01",
                    "name": "web01",
                    "status": "0",
                    "groups": [{ "name": "Linux servers" }],
                    "templates": [{ "name": "Template OS Linux" }],
                    "tags": [{ "tag": "env", "value": "prod" }],
                }]),
                "trigger.get" => json!([{
                    "description": "High CPU load on web01",
                    "priority": "3",
                }]),
                "apiinfo.version" => json!("6.0.12"),
                _ => json!(null),
            };

            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(latency_ms))
                .set_body_json(json!({ "jsonrpc": "2.0", "result": result, "id": 1 }))
        })
        .mount(&server)
        .await;

    server
}

/// Alerting backend whose RPC envelope carries an error member (the API
/// answers 200 even then).
pub async fn setup_alerting_rpc_error_mock() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api_jsonrpc.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32602,
                "message": "Invalid params.",
                "data": "Session terminated, re-login, please."
            },
            "id": 1
        })))
        .mount(&server)
        .await;

    server
}

/// Alerting backend where the host lookup works but every trigger lookup
/// blows up with a 500.
pub async fn setup_alerting_broken_triggers_mock() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api_jsonrpc.php"))
        .respond_with(move |req: &wiremock::Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap_or_default();
            match body["method"].as_str().unwrap_or_default() {
                "host.get" => ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "result": [{ "hostid": "10084", "host": "web01", "status": "0" }],
                    "id": 1
                })),
                _ => ResponseTemplate::new(500),
            }
        })
        .mount(&server)
        .await;

    server
}

/// Search backend answering infrastructure queries on any index.
pub async fn setup_search_infra_mock(latency_ms: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/_all/_search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(latency_ms))
                .set_body_json(json!({
                    "hits": { "hits": [
                        { "_source": { "host": {
                            "name": "web01", "ip": "10.0.0.5", "os": { "name": "Ubuntu" }
                        }}},
                        { "_source": { "host": { "hostname": "db02" } } },
                    ]}
                })),
        )
        .mount(&server)
        .await;

    server
}

/// Search backend answering APM queries with a service aggregation.
pub async fn setup_search_apm_mock() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/apm-*/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": { "hits": [
                { "_source": { "service": { "name": "checkout" },
                               "labels": { "domain": "shop.example.com" } } },
            ]},
            "aggregations": { "services": { "buckets": [
                { "key": "checkout", "avg_response_time": { "value": 182_000.0 } },
            ]}}
        })))
        .mount(&server)
        .await;

    server
}

/// Monitor backend where the entity lookup works but every problem lookup
/// blows up with a 500.
pub async fn setup_monitor_broken_problems_mock() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/entities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [{
                "entityId": "HOST-1A2B",
                "displayName": "web01",
                "properties": { "monitoringMode": "FULL_STACK" }
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/problems"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    server
}

/// Monitor backend answering the entities listing and per-entity problems.
pub async fn setup_monitor_mock(latency_ms: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/entities"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(latency_ms))
                .set_body_json(json!({
                    "entities": [{
                        "entityId": "HOST-1A2B",
                        "displayName": "web01",
                        "properties": { "monitoringMode": "FULL_STACK" }
                    }]
                })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/problems"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "problems": [{
                "title": "CPU saturation",
                "severityLevel": "RESOURCE_CONTENTION",
                "impactLevel": "INFRASTRUCTURE"
            }]
        })))
        .mount(&server)
        .await;

    server
}
