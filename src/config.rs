//! Caller-supplied connection settings, one struct per backend family.
//!
//! The settings layer that stores and edits these lives outside this crate;
//! configs arrive here already parsed and are read-only for the duration of
//! a call. Absent fields are empty strings, matching the settings form they
//! come from.

use serde::{Deserialize, Serialize};

fn default_timeout() -> u64 {
    30
}

/// JSON-RPC alerting backend (Zabbix-compatible). Token auth only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertingConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_token: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Search/log engine backend (Elasticsearch-compatible).
///
/// Authenticates with either basic credentials or a bearer token; the
/// adapter requires at least one of the two forms.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub bearer_token: String,
    /// Index pattern queried; the adapter falls back to a sensible default
    /// per report kind when empty.
    #[serde(default)]
    pub index_pattern: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            bearer_token: String::new(),
            index_pattern: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl SearchConfig {
    pub fn has_basic_auth(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn has_bearer_token(&self) -> bool {
        !self.bearer_token.is_empty()
    }
}

/// APM/infrastructure monitor backend (Dynatrace-compatible entities API).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: String,
    /// Host group label stamped onto returned entities; "default" when empty.
    #[serde(default)]
    pub host_group: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_token: String::new(),
            host_group: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// One config per backend per report kind it is eligible for.
///
/// The alerting and monitor backends only serve infrastructure reports; the
/// search backend carries a separate config for each report kind (different
/// clusters and index patterns in practice).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendConfigs {
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub search_infra: SearchConfig,
    #[serde(default)]
    pub search_apm: SearchConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_default_applies_on_deserialize() {
        let cfg: AlertingConfig =
            serde_json::from_str(r#"{"endpoint":"http://alerting.local"}"#).unwrap();
        assert_eq!(cfg.timeout_seconds, 30);
        assert!(cfg.api_token.is_empty());
    }

    #[test]
    fn test_search_credential_forms() {
        let mut cfg = SearchConfig {
            endpoint: "http://search.local".into(),
            ..Default::default()
        };
        assert!(!cfg.has_basic_auth());
        assert!(!cfg.has_bearer_token());

        cfg.username = "operator".into();
        assert!(!cfg.has_basic_auth());
        cfg.password = "secret".into();
        assert!(cfg.has_basic_auth());

        cfg.bearer_token = "tok".into();
        assert!(cfg.has_bearer_token());
    }
}
