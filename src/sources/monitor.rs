//! APM/infrastructure monitor adapter (Dynatrace-compatible entities API).
//!
//! Primary call selects host entities matching any token; a bounded
//! concurrent secondary round fetches each entity's open problems. A failed
//! problem lookup degrades that entity to an empty problem list.

use crate::config::MonitorConfig;
use crate::error::SourceError;
use crate::model::{Health, MonitorPayload, MonitoredEntity, Problem, SourcePayload};
use crate::source::{SourceAdapter, SourceId};
use crate::sources::SECONDARY_FAN_OUT;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const PROBLEMS_PER_ENTITY: usize = 5;

pub struct MonitorSource {
    config: MonitorConfig,
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<EntityRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityRow {
    #[serde(default)]
    entity_id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    properties: Option<EntityProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityProperties {
    #[serde(default)]
    monitoring_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProblemsResponse {
    #[serde(default)]
    problems: Vec<ProblemRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemRow {
    #[serde(default)]
    title: String,
    #[serde(default)]
    severity_level: String,
    #[serde(default)]
    impact_level: String,
}

impl MonitorSource {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    fn check_config(&self) -> Result<(), SourceError> {
        if self.config.endpoint.is_empty() || self.config.api_token.is_empty() {
            return Err(SourceError::Configuration(
                "monitor backend needs an endpoint URL and an API token".to_string(),
            ));
        }
        Ok(())
    }

    fn entity_selector(tokens: &[String]) -> String {
        let names: Vec<String> = tokens
            .iter()
            .map(|token| format!("entityName(\"{}\")", token))
            .collect();
        format!("type(\"HOST\"),{}", names.join(","))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        client: &Client,
        path: &str,
        selector: &str,
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), path);

        let response = client
            .get(&url)
            .query(&[("entitySelector", selector)])
            .header(
                "Authorization",
                format!("Api-Token {}", self.config.api_token),
            )
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, "monitor"));
        }

        response.json().await.map_err(SourceError::from)
    }

    /// Open problems for one entity; failures degrade to an empty list.
    async fn fetch_problems(&self, client: &Client, entity: &EntityRow) -> Vec<Problem> {
        let selector = format!("entityId(\"{}\")", entity.entity_id);
        match self
            .get_json::<ProblemsResponse>(client, "/api/v2/problems", &selector)
            .await
        {
            Ok(response) => response
                .problems
                .into_iter()
                .take(PROBLEMS_PER_ENTITY)
                .map(|row| Problem {
                    title: row.title,
                    severity_level: row.severity_level,
                    impact_level: row.impact_level,
                })
                .collect(),
            Err(err) => {
                warn!(entity = %entity.display_name, error = %err,
                    "problem lookup failed, returning empty list");
                Vec::new()
            }
        }
    }

    fn host_group(&self) -> String {
        if self.config.host_group.is_empty() {
            "default".to_string()
        } else {
            self.config.host_group.clone()
        }
    }
}

#[async_trait]
impl SourceAdapter for MonitorSource {
    fn id(&self) -> SourceId {
        SourceId::ApmMonitor
    }

    async fn query(
        &self,
        client: &Client,
        tokens: &[String],
    ) -> Result<SourcePayload, SourceError> {
        self.check_config()?;

        let selector = Self::entity_selector(tokens);
        let response = self
            .get_json::<EntitiesResponse>(client, "/api/v2/entities", &selector)
            .await?;
        debug!(matched = response.entities.len(), "monitor entity lookup complete");

        let hosts: Vec<MonitoredEntity> = futures::stream::iter(response.entities)
            .map(|entity| async move {
                let problems = self.fetch_problems(client, &entity).await;
                MonitoredEntity {
                    name: entity.display_name,
                    monitoring_mode: entity
                        .properties
                        .and_then(|p| p.monitoring_mode)
                        .unwrap_or_else(|| "INFRASTRUCTURE".to_string()),
                    host_group: self.host_group(),
                    health: if problems.is_empty() {
                        Health::Healthy
                    } else {
                        Health::Warning
                    },
                    problems,
                }
            })
            .buffer_unordered(SECONDARY_FAN_OUT)
            .collect()
            .await;

        Ok(SourcePayload::Monitor(MonitorPayload { hosts }))
    }
}
