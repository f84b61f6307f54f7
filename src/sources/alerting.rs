//! JSON-RPC alerting backend adapter (Zabbix-compatible API).
//!
//! Two rounds per query: a `host.get` matching any of the lookup tokens,
//! then a bounded concurrent `trigger.get` per matched host for its active
//! triggers. A failed trigger lookup degrades that host to an empty trigger
//! list instead of failing the whole envelope.

use crate::config::AlertingConfig;
use crate::error::SourceError;
use crate::model::{AlertHost, AlertingPayload, HostTag, Severity, SourcePayload, Trigger};
use crate::source::{SourceAdapter, SourceId};
use crate::sources::SECONDARY_FAN_OUT;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub struct AlertingSource {
    config: AlertingConfig,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagRow {
    #[serde(default)]
    tag: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct HostRow {
    #[serde(default)]
    hostid: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    groups: Vec<Named>,
    #[serde(default)]
    templates: Vec<Named>,
    #[serde(default)]
    tags: Vec<TagRow>,
}

#[derive(Debug, Deserialize)]
struct TriggerRow {
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: String,
}

impl AlertingSource {
    pub fn new(config: AlertingConfig) -> Self {
        Self { config }
    }

    fn check_config(&self) -> Result<(), SourceError> {
        if self.config.endpoint.is_empty() || self.config.api_token.is_empty() {
            return Err(SourceError::Configuration(
                "alerting backend needs an endpoint URL and an API token".to_string(),
            ));
        }
        Ok(())
    }

    /// One JSON-RPC round trip. An `error` member in the envelope is a
    /// protocol failure carrying the backend's own message.
    async fn rpc(
        &self,
        client: &Client,
        method: &str,
        params: Value,
    ) -> Result<Value, SourceError> {
        let url = format!(
            "{}/api_jsonrpc.php",
            self.config.endpoint.trim_end_matches('/')
        );

        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(&json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "auth": self.config.api_token,
                "id": 1,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, "alerting"));
        }

        let envelope: RpcEnvelope = response.json().await?;
        if let Some(err) = envelope.error {
            let detail = err.data.unwrap_or_default();
            return Err(SourceError::Protocol {
                status: None,
                message: format!("alerting RPC error: {} {}", err.message, detail)
                    .trim_end()
                    .to_string(),
            });
        }

        envelope
            .result
            .ok_or_else(|| SourceError::Parse("RPC response without result".to_string()))
    }

    async fn fetch_hosts(
        &self,
        client: &Client,
        tokens: &[String],
    ) -> Result<Vec<HostRow>, SourceError> {
        let result = self
            .rpc(
                client,
                "host.get",
                json!({
                    "output": ["hostid", "host", "name", "status"],
                    "selectGroups": ["name"],
                    "selectTags": ["tag", "value"],
                    "selectTemplates": ["name"],
                    "filter": { "host": tokens },
                }),
            )
            .await?;

        serde_json::from_value(result).map_err(SourceError::from)
    }

    /// Active, enabled triggers for one host. Failures degrade to an empty
    /// list; the host itself still appears in the payload.
    async fn fetch_triggers(&self, client: &Client, host: &HostRow) -> Vec<Trigger> {
        let result = self
            .rpc(
                client,
                "trigger.get",
                json!({
                    "output": ["description", "priority"],
                    "hostids": host.hostid,
                    "filter": { "value": "1", "status": "0" },
                    "monitored": true,
                }),
            )
            .await;

        match result.and_then(|value| {
            serde_json::from_value::<Vec<TriggerRow>>(value).map_err(SourceError::from)
        }) {
            Ok(rows) => rows
                .into_iter()
                .map(|row| Trigger {
                    description: row.description,
                    severity: Severity::from_priority(&row.priority),
                })
                .collect(),
            Err(err) => {
                warn!(host = %host.host, error = %err, "trigger lookup failed, returning empty list");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for AlertingSource {
    fn id(&self) -> SourceId {
        SourceId::Alerting
    }

    async fn query(
        &self,
        client: &Client,
        tokens: &[String],
    ) -> Result<SourcePayload, SourceError> {
        self.check_config()?;

        let rows = self.fetch_hosts(client, tokens).await?;
        debug!(matched = rows.len(), "alerting host lookup complete");

        let hosts: Vec<AlertHost> = futures::stream::iter(rows)
            .map(|row| async move {
                let triggers = self.fetch_triggers(client, &row).await;
                AlertHost {
                    name: row.host,
                    agent_active: row.status == "0",
                    groups: row.groups.into_iter().map(|g| g.name).collect(),
                    templates: row.templates.into_iter().map(|t| t.name).collect(),
                    tags: row
                        .tags
                        .into_iter()
                        .map(|t| HostTag {
                            tag: t.tag,
                            value: t.value,
                        })
                        .collect(),
                    triggers,
                }
            })
            .buffer_unordered(SECONDARY_FAN_OUT)
            .collect()
            .await;

        Ok(SourcePayload::Alerting(AlertingPayload { hosts }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AlertingConfig {
        AlertingConfig {
            endpoint: "http://alerting.local".into(),
            api_token: "tok".into(),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_io() {
        let source = AlertingSource::new(AlertingConfig {
            api_token: String::new(),
            ..config()
        });
        let client = Client::new();
        let err = source
            .query(&client, &["web01".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_host_row_deserializes_partial_objects() {
        let row: HostRow = serde_json::from_value(json!({
            "hostid": "10084",
            "host": "web01",
            "status": "0",
        }))
        .unwrap();
        assert_eq!(row.host, "web01");
        assert!(row.groups.is_empty());
        assert!(row.tags.is_empty());
    }
}
