//! Connection probing for the settings tooling.
//!
//! Each probe issues the cheapest backend call that proves both reachability
//! and credential validity, never a data query. The three failure classes an
//! operator needs to tell apart — incomplete configuration, rejected
//! credentials and a server that was never reached — surface as distinct
//! error kinds with distinct messages.

use crate::config::{AlertingConfig, MonitorConfig, SearchConfig};
use crate::error::{SourceError, SourceFailure};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Outcome of one connection probe.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub reachable: bool,
    pub detail: Option<ProbeDetail>,
    pub error: Option<SourceFailure>,
}

/// Backend-specific evidence that the probe really talked to the service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeDetail {
    Version { version: String },
    ClusterHealth {
        cluster: String,
        status: String,
        nodes: u64,
    },
    ActiveGates { count: usize },
}

impl ProbeReport {
    fn from_result(result: Result<ProbeDetail, SourceError>) -> Self {
        match result {
            Ok(detail) => Self {
                reachable: true,
                detail: Some(detail),
                error: None,
            },
            Err(err) => Self {
                reachable: false,
                detail: None,
                error: Some(err.into()),
            },
        }
    }
}

/// Probe the alerting backend with its version RPC.
pub async fn probe_alerting(client: &Client, config: &AlertingConfig) -> ProbeReport {
    ProbeReport::from_result(try_alerting(client, config).await)
}

/// Probe the search backend with its cluster-health endpoint.
pub async fn probe_search(client: &Client, config: &SearchConfig) -> ProbeReport {
    ProbeReport::from_result(try_search(client, config).await)
}

/// Probe the monitor backend with its active-gates listing.
pub async fn probe_monitor(client: &Client, config: &MonitorConfig) -> ProbeReport {
    ProbeReport::from_result(try_monitor(client, config).await)
}

#[derive(Debug, Deserialize)]
struct RpcProbeEnvelope {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcProbeError>,
}

#[derive(Debug, Deserialize)]
struct RpcProbeError {
    #[serde(default)]
    message: String,
}

async fn try_alerting(
    client: &Client,
    config: &AlertingConfig,
) -> Result<ProbeDetail, SourceError> {
    if config.endpoint.is_empty() || config.api_token.is_empty() {
        return Err(SourceError::Configuration(
            "alerting probe needs an endpoint URL and an API token".to_string(),
        ));
    }

    let url = format!("{}/api_jsonrpc.php", config.endpoint.trim_end_matches('/'));
    let response = client
        .post(&url)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(config.timeout_seconds))
        .json(&json!({
            "jsonrpc": "2.0",
            "method": "apiinfo.version",
            "auth": config.api_token,
            "id": 1,
        }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::from_status(status, "alerting"));
    }

    let envelope: RpcProbeEnvelope = response.json().await?;
    if let Some(err) = envelope.error {
        // The alerting API answers 200 even for bad tokens; the rejection
        // lives in the RPC error member.
        return Err(SourceError::Authentication(format!(
            "alerting rejected the API token: {}",
            err.message
        )));
    }

    let version = envelope
        .result
        .ok_or_else(|| SourceError::Parse("version RPC returned no result".to_string()))?;
    Ok(ProbeDetail::Version { version })
}

#[derive(Debug, Deserialize)]
struct ClusterHealthBody {
    #[serde(default)]
    cluster_name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    number_of_nodes: u64,
}

async fn try_search(client: &Client, config: &SearchConfig) -> Result<ProbeDetail, SourceError> {
    if config.endpoint.is_empty() {
        return Err(SourceError::Configuration(
            "search probe needs an endpoint URL".to_string(),
        ));
    }
    if !config.has_basic_auth() && !config.has_bearer_token() {
        return Err(SourceError::Configuration(
            "search probe needs either username/password or a bearer token".to_string(),
        ));
    }

    let url = format!("{}/_cluster/health", config.endpoint.trim_end_matches('/'));
    let mut request = client
        .get(&url)
        .timeout(Duration::from_secs(config.timeout_seconds));

    if config.has_basic_auth() {
        let encoded = BASE64.encode(format!("{}:{}", config.username, config.password));
        request = request.header("Authorization", format!("Basic {}", encoded));
    } else {
        request = request.header("Authorization", format!("Bearer {}", config.bearer_token));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::from_status(status, "search"));
    }

    let body: ClusterHealthBody = response.json().await?;
    Ok(ProbeDetail::ClusterHealth {
        cluster: body.cluster_name,
        status: body.status,
        nodes: body.number_of_nodes,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveGatesBody {
    #[serde(default)]
    active_gates: Vec<serde_json::Value>,
}

async fn try_monitor(
    client: &Client,
    config: &MonitorConfig,
) -> Result<ProbeDetail, SourceError> {
    if config.endpoint.is_empty() || config.api_token.is_empty() {
        return Err(SourceError::Configuration(
            "monitor probe needs an endpoint URL and an API token".to_string(),
        ));
    }

    let url = format!(
        "{}/api/v2/activeGates",
        config.endpoint.trim_end_matches('/')
    );
    let response = client
        .get(&url)
        .header("Authorization", format!("Api-Token {}", config.api_token))
        .timeout(Duration::from_secs(config.timeout_seconds))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::from_status(status, "monitor"));
    }

    let body: ActiveGatesBody = response.json().await?;
    Ok(ProbeDetail::ActiveGates {
        count: body.active_gates.len(),
    })
}
