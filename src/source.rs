use crate::error::SourceError;
use crate::model::SourcePayload;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Identifier of one monitoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceId {
    Alerting,
    Search,
    ApmMonitor,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alerting => "alerting",
            Self::Search => "search",
            Self::ApmMonitor => "apm-monitor",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alerting" => Ok(Self::Alerting),
            "search" => Ok(Self::Search),
            "apm-monitor" => Ok(Self::ApmMonitor),
            _ => Err(()),
        }
    }
}

/// Unified interface for querying one monitoring backend.
///
/// Each implementation encapsulates:
/// - URL construction and the backend's native query language
/// - Authentication (JSON-RPC auth field, Basic/Bearer, Api-Token header)
/// - Mapping the native response into the common payload model
///
/// Shared contract: the token slice is non-empty; missing required config
/// fields fail with `SourceError::Configuration` before any network I/O;
/// matching is OR across tokens; a single attempt per call, with the
/// deadline applied on the request itself.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    async fn query(
        &self,
        client: &Client,
        tokens: &[String],
    ) -> Result<SourcePayload, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_round_trip() {
        for id in [SourceId::Alerting, SourceId::Search, SourceId::ApmMonitor] {
            assert_eq!(id.as_str().parse::<SourceId>(), Ok(id));
        }
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        assert!("grafana".parse::<SourceId>().is_err());
        assert!("".parse::<SourceId>().is_err());
    }
}
