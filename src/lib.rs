//! Unified status queries across independent monitoring backends.
//!
//! One free-text query fans out to an alerting system, a log/metrics search
//! engine and an APM/infrastructure monitor, and comes back as a single
//! result with one envelope per backend. The surrounding application (forms,
//! settings storage, rendering, login) lives outside this crate; the sole
//! entry point here is [`Aggregator::aggregate`], plus the connection probes
//! used by configuration tooling.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod probe;
pub mod query;
pub mod source;
pub mod sources;

pub use aggregate::{AggregateError, AggregateResult, Aggregator, SourceEnvelope, SourceOutcome, SourceSelection};
pub use config::{AlertingConfig, BackendConfigs, MonitorConfig, SearchConfig};
pub use error::{ErrorKind, SourceError, SourceFailure};
pub use model::ReportKind;
pub use probe::{probe_alerting, probe_monitor, probe_search, ProbeDetail, ProbeReport};
pub use source::{SourceAdapter, SourceId};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
