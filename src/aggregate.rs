//! The multi-source aggregator: fan out one query across the selected
//! backends, fan the envelopes back in.
//!
//! Every backend failure is caught at the per-backend boundary and becomes a
//! failed envelope; a slow or broken backend never blocks or hides its
//! siblings. The only error `aggregate()` itself returns is a caller bug:
//! an unrecognized backend identifier in the selection.

use crate::config::BackendConfigs;
use crate::error::{ErrorKind, SourceFailure};
use crate::model::{ReportKind, SourcePayload};
use crate::query;
use crate::source::{SourceAdapter, SourceId};
use crate::sources::{AlertingSource, MonitorSource, SearchSource};
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Which backends the caller wants queried.
///
/// `All` means every backend eligible for the report kind; an explicit set
/// is intersected with eligibility. Modeled as a tagged variant so no magic
/// catch-all string travels through the call path.
#[derive(Debug, Clone)]
pub enum SourceSelection {
    All,
    Explicit(BTreeSet<String>),
}

/// Contract violation by the caller. Runtime backend failures never surface
/// here; they live inside the envelopes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("unknown backend identifier in selection: {0:?}")]
    UnknownSource(String),
}

/// Terminal state of one dispatched backend. A dispatch is pending only
/// while in flight; a returned result holds exactly one of these.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceOutcome {
    Succeeded { payload: SourcePayload },
    Failed { kind: ErrorKind, message: String },
}

/// Per-backend unit of partial result.
#[derive(Debug, Clone, Serialize)]
pub struct SourceEnvelope {
    pub source: SourceId,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

impl SourceEnvelope {
    pub fn is_succeeded(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Succeeded { .. })
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            SourceOutcome::Failed { kind, .. } => Some(*kind),
            SourceOutcome::Succeeded { .. } => None,
        }
    }
}

/// Merged result of one aggregate call. Backends that were not selected or
/// not eligible are absent, never marked failed.
#[derive(Debug, Serialize)]
pub struct AggregateResult {
    pub report_kind: ReportKind,
    pub tokens: Vec<String>,
    pub envelopes: Vec<SourceEnvelope>,
}

impl AggregateResult {
    pub fn envelope(&self, source: SourceId) -> Option<&SourceEnvelope> {
        self.envelopes.iter().find(|e| e.source == source)
    }
}

/// Backends eligible for a report kind, in declared (cosmetic) result order.
fn eligible_sources(report_kind: ReportKind) -> &'static [SourceId] {
    match report_kind {
        ReportKind::Infrastructure => {
            &[SourceId::Alerting, SourceId::Search, SourceId::ApmMonitor]
        }
        ReportKind::ApplicationPerformance => &[SourceId::Search],
    }
}

fn resolve_selection(
    selection: &SourceSelection,
    report_kind: ReportKind,
) -> Result<Vec<SourceId>, AggregateError> {
    let eligible = eligible_sources(report_kind);
    match selection {
        SourceSelection::All => Ok(eligible.to_vec()),
        SourceSelection::Explicit(names) => {
            let mut chosen = BTreeSet::new();
            for name in names {
                let id: SourceId = name
                    .parse()
                    .map_err(|_| AggregateError::UnknownSource(name.clone()))?;
                chosen.insert(id);
            }
            Ok(eligible
                .iter()
                .copied()
                .filter(|id| chosen.contains(id))
                .collect())
        }
    }
}

pub struct Aggregator {
    client: Client,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Reuse an existing HTTP client (its connection pool is the only state
    /// shared between calls).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Run one unified status query.
    ///
    /// Normalizes the query text, dispatches every selected-and-eligible
    /// backend concurrently and joins on all of them. Wall-clock cost is the
    /// slowest backend's own deadline, not the sum.
    pub async fn aggregate(
        &self,
        query_text: &str,
        report_kind: ReportKind,
        selection: &SourceSelection,
        configs: &BackendConfigs,
    ) -> Result<AggregateResult, AggregateError> {
        let tokens = query::normalize(query_text);
        if tokens.is_empty() {
            debug!("query normalized to no tokens, nothing to dispatch");
            return Ok(AggregateResult {
                report_kind,
                tokens,
                envelopes: Vec::new(),
            });
        }

        let effective = resolve_selection(selection, report_kind)?;
        info!(
            tokens = tokens.len(),
            backends = effective.len(),
            kind = ?report_kind,
            "dispatching aggregate query"
        );

        let adapters: Vec<Box<dyn SourceAdapter>> = effective
            .iter()
            .map(|id| self.build_adapter(*id, report_kind, configs))
            .collect();

        let envelopes = join_all(adapters.iter().map(|adapter| {
            let tokens = &tokens;
            async move {
                let outcome = match adapter.query(&self.client, tokens).await {
                    Ok(payload) => SourceOutcome::Succeeded { payload },
                    Err(err) => {
                        warn!(source = %adapter.id(), error = %err, "backend query failed");
                        let failure = SourceFailure::from(err);
                        SourceOutcome::Failed {
                            kind: failure.kind,
                            message: failure.message,
                        }
                    }
                };
                SourceEnvelope {
                    source: adapter.id(),
                    outcome,
                }
            }
        }))
        .await;

        Ok(AggregateResult {
            report_kind,
            tokens,
            envelopes,
        })
    }

    fn build_adapter(
        &self,
        id: SourceId,
        report_kind: ReportKind,
        configs: &BackendConfigs,
    ) -> Box<dyn SourceAdapter> {
        match id {
            SourceId::Alerting => Box::new(AlertingSource::new(configs.alerting.clone())),
            SourceId::ApmMonitor => Box::new(MonitorSource::new(configs.monitor.clone())),
            SourceId::Search => match report_kind {
                ReportKind::Infrastructure => {
                    Box::new(SearchSource::infra(configs.search_infra.clone()))
                }
                ReportKind::ApplicationPerformance => {
                    Box::new(SearchSource::apm(configs.search_apm.clone()))
                }
            },
        }
    }
}
