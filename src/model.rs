//! Common result payloads shared by all source adapters.
//!
//! Each backend speaks its own severity/health vocabulary; adapters collapse
//! those into the closed sets below. Values the mapping does not recognize
//! land in the `Unknown` bucket rather than being dropped.

use serde::{Deserialize, Serialize};

/// What kind of report the operator asked for. Determines which backends
/// are eligible for the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    Infrastructure,
    ApplicationPerformance,
}

/// Alert severity, collapsed from the alerting backend's trigger priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Informational,
    Warning,
    Average,
    High,
    Disaster,
    Unknown,
}

impl Severity {
    /// Map a native trigger priority ("0".."4") to the closed set.
    pub fn from_priority(priority: &str) -> Self {
        match priority {
            "0" => Self::Informational,
            "1" => Self::Warning,
            "2" => Self::Average,
            "3" => Self::High,
            "4" => Self::Disaster,
            _ => Self::Unknown,
        }
    }
}

/// Entity health, collapsed from backend-native states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

/// An active trigger on an alerting-backend host.
#[derive(Debug, Clone, Serialize)]
pub struct Trigger {
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostTag {
    pub tag: String,
    pub value: String,
}

/// A host matched by the alerting backend, with its active triggers.
#[derive(Debug, Clone, Serialize)]
pub struct AlertHost {
    pub name: String,
    pub agent_active: bool,
    pub groups: Vec<String>,
    pub templates: Vec<String>,
    pub tags: Vec<HostTag>,
    pub triggers: Vec<Trigger>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertingPayload {
    pub hosts: Vec<AlertHost>,
}

/// A host seen in the search engine's infrastructure indices.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedHost {
    pub hostname: String,
    pub ip: Option<String>,
    pub os: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchInfraPayload {
    pub hosts: Vec<LoggedHost>,
}

/// A service matched by the APM search query.
#[derive(Debug, Clone, Serialize)]
pub struct ApmApplication {
    pub name: String,
    /// The query token that actually matched this service, when the hits
    /// reveal it.
    pub domain: Option<String>,
    pub health: Health,
    pub avg_response_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchApmPayload {
    pub applications: Vec<ApmApplication>,
}

/// An open problem on a monitored entity.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub title: String,
    pub severity_level: String,
    pub impact_level: String,
}

/// A host entity from the APM/infra monitor, with its open problems.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoredEntity {
    pub name: String,
    pub monitoring_mode: String,
    pub host_group: String,
    pub health: Health,
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorPayload {
    pub hosts: Vec<MonitoredEntity>,
}

/// Backend-specific payload carried by a succeeded envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SourcePayload {
    Alerting(AlertingPayload),
    SearchInfra(SearchInfraPayload),
    SearchApm(SearchApmPayload),
    Monitor(MonitorPayload),
}
